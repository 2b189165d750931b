//! Module tree: the namespace of callable endpoints and model aliases.

use indexmap::IndexMap;

use crate::endpoint::Endpoint;
use crate::schema::Schema;

/// What can be added to a [`Module`].
#[derive(Debug, Clone)]
pub enum Node {
    Endpoint(Endpoint),
    Module(Module),
}

impl From<Endpoint> for Node {
    fn from(endpoint: Endpoint) -> Self {
        Node::Endpoint(endpoint)
    }
}

impl From<Module> for Node {
    fn from(module: Module) -> Self {
        Node::Module(module)
    }
}

/// A namespace node owning endpoints, named model aliases and child modules.
///
/// Built once with the consuming [`Module::add`] / [`Module::declare_models`]
/// calls, then frozen behind an `Arc` and shared by every dispatcher and
/// introspection caller.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    endpoints: IndexMap<String, Endpoint>,
    models: IndexMap<String, Schema>,
    submodules: Vec<Module>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoints: IndexMap::new(),
            models: IndexMap::new(),
            submodules: Vec::new(),
        }
    }

    /// Add an endpoint or a child module.
    ///
    /// Endpoints are keyed by name: registering a name twice replaces the
    /// earlier endpoint (last write wins) while keeping its original position.
    /// Child modules are appended in declaration order.
    pub fn add(mut self, node: impl Into<Node>) -> Self {
        match node.into() {
            Node::Endpoint(endpoint) => {
                let name = endpoint.name().to_string();
                if self.endpoints.insert(name.clone(), endpoint).is_some() {
                    tracing::debug!(
                        module = %self.name,
                        endpoint = %name,
                        "Endpoint registered twice; keeping the latest definition"
                    );
                }
            }
            Node::Module(child) => self.submodules.push(child),
        }
        self
    }

    /// Merge alias-name -> schema pairs into the model table.
    /// Later declarations override earlier ones with the same name.
    pub fn declare_models<I, K>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        for (name, schema) in models {
            self.models.insert(name.into(), schema);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Own endpoints in registration order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    /// Own endpoint by name (no descent into submodules).
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    /// Own model aliases in declaration order.
    pub fn models(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.models.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn submodules(&self) -> &[Module] {
        &self.submodules
    }

    /// Resolve an endpoint anywhere in the tree.
    ///
    /// Depth-first: this module's own endpoints, then each submodule in
    /// declaration order. The first match wins.
    pub fn resolve(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints
            .get(name)
            .or_else(|| self.submodules.iter().find_map(|m| m.resolve(name)))
    }

    /// Every endpoint in resolution order, including shadowed ones.
    pub fn walk_endpoints(&self) -> Vec<&Endpoint> {
        let mut out: Vec<&Endpoint> = self.endpoints.values().collect();
        for child in &self.submodules {
            out.extend(child.walk_endpoints());
        }
        out
    }
}
