use stackc_lib::config::{HttpMethod, OutputKey, RoleKind, RoleSpec, StackConfig, TrustedService};
use stackc_lib::graph::{Attributes, Integration, NodeId, Stage};
use stackc_lib::naming::ResourceKind;

use super::common::{compile_ok, demo_stack, endpoint, extractaudio_stack, function};

fn video_api_stack() -> StackConfig {
  let mut config = extractaudio_stack();
  config.roles.push(RoleSpec {
    name: "data-access".to_string(),
    kind: RoleKind::DataAccess,
    trust: TrustedService::Lambda,
    statements: Vec::new(),
  });
  config.functions.push(function("listvideos", RoleKind::DataAccess, 256, 30));
  config.functions.push(function("getvideo", RoleKind::DataAccess, 256, 30));
  config
    .endpoints
    .push(endpoint("listVideos", "/videos", HttpMethod::Get, "listvideos"));
  config
    .endpoints
    .push(endpoint("getVideo", "/video/{videoId}", HttpMethod::Get, "getvideo"));
  config
}

#[test]
fn video_paths_form_a_shared_tree() {
  let compiled = compile_ok(&video_api_stack(), "dev");
  let graph = &compiled.graph;

  let resources: Vec<&str> = graph
    .stage_nodes(Stage::Gateway)
    .filter(|n| n.kind == ResourceKind::ApiResource)
    .map(|n| n.id.as_str())
    .collect();
  assert_eq!(resources, vec![
    "api/resource/video",
    "api/resource/video/{videoId}",
    "api/resource/videos"
  ]);

  let child = graph.get(&NodeId::api_resource("/video/{videoId}")).unwrap();
  let Attributes::ApiResource(ref attrs) = child.attributes else {
    panic!("expected an api resource");
  };
  assert_eq!(attrs.parent, Some(NodeId::api_resource("/video")));
  assert_eq!(attrs.path_part, "{videoId}");

  let videos = graph.get(&NodeId::api_resource("/videos")).unwrap();
  let Attributes::ApiResource(ref attrs) = videos.attributes else {
    panic!("expected an api resource");
  };
  assert_eq!(attrs.parent, None);

  for leaf in ["/videos", "/video/{videoId}"] {
    let methods: Vec<_> = graph
      .dependents(&NodeId::api_resource(leaf))
      .filter(|n| n.kind == ResourceKind::ApiMethod)
      .map(|n| n.id.clone())
      .collect();
    assert_eq!(methods, vec![
      NodeId::api_method(leaf, HttpMethod::Get),
      NodeId::api_method(leaf, HttpMethod::Options)
    ]);
  }

  assert!(
    graph
      .dependents(&NodeId::api_resource("/video"))
      .all(|n| n.kind == ResourceKind::ApiResource)
  );
}

#[test]
fn preflight_lists_observed_methods() {
  let compiled = compile_ok(&video_api_stack(), "dev");
  let preflight = compiled
    .graph
    .get(&NodeId::api_method("/videos", HttpMethod::Options))
    .unwrap();

  let Attributes::ApiMethod(ref attrs) = preflight.attributes else {
    panic!("expected an api method");
  };
  match &attrs.integration {
    Integration::Preflight { allowed_methods, .. } => {
      assert_eq!(allowed_methods, &vec![HttpMethod::Get, HttpMethod::Options]);
    }
    other => panic!("expected a preflight integration, got {:?}", other),
  }
}

#[test]
fn methods_invoke_their_target_function() {
  let compiled = compile_ok(&demo_stack(), "staging");
  let method = compiled
    .graph
    .get(&NodeId::api_method("/video/{videoId}", HttpMethod::Get))
    .unwrap();

  assert!(method.depends_on.contains(&NodeId::function("getvideo")));
  let Attributes::ApiMethod(ref attrs) = method.attributes else {
    panic!("expected an api method");
  };
  assert_eq!(attrs.required_parameters, vec!["method.request.path.videoId".to_string()]);
  assert!(matches!(
    attrs.integration,
    Integration::Lambda { ref function, .. } if function == "vidscribe-staging-getvideo"
  ));
}

#[test]
fn deployment_waits_for_every_method() {
  let compiled = compile_ok(&demo_stack(), "prod");
  let graph = &compiled.graph;
  let deployment = graph.get(&NodeId::api_deployment()).unwrap();

  let methods: Vec<_> = graph
    .iter()
    .filter(|n| n.kind == ResourceKind::ApiMethod)
    .map(|n| n.id.clone())
    .collect();
  assert!(!methods.is_empty());
  for id in methods {
    assert!(deployment.depends_on.contains(&id), "deployment must depend on {}", id);
  }

  let Attributes::Deployment(ref attrs) = deployment.attributes else {
    panic!("expected a deployment");
  };
  assert_eq!(attrs.stage_name, "prod");
  assert_eq!(attrs.throttle.rate_limit, 1000);
}

#[test]
fn no_endpoints_means_no_api() {
  let compiled = compile_ok(&extractaudio_stack(), "dev");
  assert_eq!(compiled.graph.stage_nodes(Stage::Gateway).count(), 0);
  assert!(!compiled.document.outputs.contains_key(&OutputKey::ApiUrl));
}
