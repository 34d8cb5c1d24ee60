//! Gateway stage: REST API, shared path tree, methods and deployment.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::{EndpointSpec, HttpMethod, PathSegment, join_path, parse_path};
use crate::naming::ResourceKind;
use crate::placeholder;

use super::builder::Builder;
use super::types::*;

/// One resource of the path tree.
#[derive(Debug)]
struct TreeNode<'a> {
  segment: PathSegment,
  /// Joined path of the parent, `None` under the API root.
  parent: Option<String>,
  methods: BTreeMap<HttpMethod, &'a EndpointSpec>,
}

/// Every unique path prefix of the endpoint set, each exactly once.
///
/// Keys are joined paths. A parent path is a strict prefix of its children, so
/// iterating the map visits parents first.
#[derive(Debug, Default)]
struct PathTree<'a> {
  nodes: BTreeMap<String, TreeNode<'a>>,
}

impl<'a> PathTree<'a> {
  fn from_endpoints(endpoints: &'a [EndpointSpec]) -> Result<Self, String> {
    let mut tree = PathTree::default();
    for endpoint in endpoints {
      let segments = parse_path(&endpoint.path)?;
      let mut parent: Option<String> = None;

      for depth in 1..=segments.len() {
        let path = join_path(&segments[..depth]);
        tree.nodes.entry(path.clone()).or_insert_with(|| TreeNode {
          segment: segments[depth - 1].clone(),
          parent: parent.clone(),
          methods: BTreeMap::new(),
        });
        parent = Some(path);
      }

      if let Some(path) = parent
        && let Some(leaf) = tree.nodes.get_mut(&path)
      {
        leaf.methods.insert(endpoint.method, endpoint);
      }
    }
    Ok(tree)
  }
}

pub(super) fn build_gateway(b: &mut Builder<'_>) -> Result<(), BuildError> {
  let config = b.config;
  if config.endpoints.is_empty() {
    debug!(stage = %Stage::Gateway, "no endpoints declared, skipping gateway");
    return Ok(());
  }

  let tree = PathTree::from_endpoints(&config.endpoints).map_err(BuildError::InvalidPath)?;

  let api_id = NodeId::api();
  let api_physical = b.ctx.physical_name(ResourceKind::RestApi, "api")?;
  let api = b.node(
    api_id.clone(),
    ResourceKind::RestApi,
    api_physical,
    Attributes::RestApi(RestApiAttributes {
      endpoint_type: "REGIONAL".to_string(),
      root_resource: placeholder::reference(api_id.as_str(), "root_resource_id"),
    }),
    BTreeSet::new(),
  );
  b.graph.insert(api)?;

  for (path, node) in &tree.nodes {
    let parent = node.parent.as_deref().map(NodeId::api_resource);
    let mut depends_on = BTreeSet::from([api_id.clone()]);
    depends_on.extend(parent.clone());

    let physical = b.ctx.physical_name(ResourceKind::ApiResource, &format!("api{}", path))?;
    let resource = b.node(
      NodeId::api_resource(path),
      ResourceKind::ApiResource,
      physical,
      Attributes::ApiResource(ApiResourceAttributes {
        path: path.clone(),
        path_part: node.segment.to_string(),
        parent,
      }),
      depends_on,
    );
    b.graph.insert(resource)?;
  }

  let mut methods = BTreeSet::new();
  for (path, node) in &tree.nodes {
    if node.methods.is_empty() {
      continue;
    }
    let resource_id = NodeId::api_resource(path);

    for (&method, endpoint) in &node.methods {
      let function = b.function_named(&endpoint.target)?;
      let integration = Integration::Lambda {
        function: function.physical.clone(),
        function_arn: function.arn.clone(),
      };

      let required_parameters = if endpoint.validation.parameters {
        parse_path(path)
          .unwrap_or_default()
          .iter()
          .filter_map(|segment| match segment {
            PathSegment::Parameter(name) => Some(format!("method.request.path.{}", name)),
            PathSegment::Literal(_) => None,
          })
          .collect()
      } else {
        Vec::new()
      };

      let id = NodeId::api_method(path, method);
      let physical = b
        .ctx
        .physical_name(ResourceKind::ApiMethod, &format!("api{}/{}", path, method))?;
      let depends_on = BTreeSet::from([
        api_id.clone(),
        resource_id.clone(),
        NodeId::function(&endpoint.target),
      ]);
      let attributes = Attributes::ApiMethod(ApiMethodAttributes {
        http_method: method,
        path: path.clone(),
        integration,
        required_parameters,
        validate_body: endpoint.validation.body,
      });
      let method_node = b.node(id.clone(), ResourceKind::ApiMethod, physical, attributes, depends_on);
      b.graph.insert(method_node)?;
      methods.insert(id);
    }

    // Preflight covering every method observed at this path.
    let mut allowed_methods: Vec<HttpMethod> = node.methods.keys().copied().collect();
    allowed_methods.push(HttpMethod::Options);
    let id = NodeId::api_method(path, HttpMethod::Options);
    let physical = b
      .ctx
      .physical_name(ResourceKind::ApiMethod, &format!("api{}/{}", path, HttpMethod::Options))?;
    let attributes = Attributes::ApiMethod(ApiMethodAttributes {
      http_method: HttpMethod::Options,
      path: path.clone(),
      integration: Integration::Preflight {
        allowed_methods,
        allowed_origins: vec!["*".to_string()],
      },
      required_parameters: Vec::new(),
      validate_body: false,
    });
    let depends_on = BTreeSet::from([api_id.clone(), resource_id]);
    let preflight = b.node(id.clone(), ResourceKind::ApiMethod, physical, attributes, depends_on);
    b.graph.insert(preflight)?;
    methods.insert(id);
  }

  let deployment_physical = b.ctx.physical_name(ResourceKind::ApiDeployment, "api-deployment")?;
  let mut depends_on = methods;
  depends_on.insert(api_id);
  let attributes = Attributes::Deployment(DeploymentAttributes {
    stage_name: b.ctx.environment.as_str().to_string(),
    throttle: b.profile.throttle,
    cache: b.profile.cache,
    logging_level: b.profile.log_level,
    tracing: b.profile.tracing,
  });
  let deployment = b.node(
    NodeId::api_deployment(),
    ResourceKind::ApiDeployment,
    deployment_physical,
    attributes,
    depends_on,
  );
  b.graph.insert(deployment)?;

  Ok(())
}
