use crate::chain::Chain;
use crate::noop::NoOp;
use crate::*;

/// Registry is a collector for interceptors.
///
/// Builders are kept in registration order; every PeerConnection built from
/// the registry gets its own fresh set of interceptors.
#[derive(Default)]
pub struct Registry {
    builders: Vec<Box<dyn InterceptorBuilder + Send + Sync>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { builders: vec![] }
    }

    /// with appends a builder and returns the registry for chaining.
    pub fn with(mut self, builder: Box<dyn InterceptorBuilder + Send + Sync>) -> Self {
        self.add(builder);
        self
    }

    /// add adds a new Interceptor to the registry.
    pub fn add(&mut self, builder: Box<dyn InterceptorBuilder + Send + Sync>) {
        self.builders.push(builder);
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// build constructs a single Interceptor from a InterceptorRegistry
    pub fn build(&self, id: &str) -> Result<Arc<dyn Interceptor + Send + Sync>> {
        if self.builders.is_empty() {
            return Ok(Arc::new(NoOp));
        }

        self.build_chain(id)
            .map(|c| Arc::new(c) as Arc<dyn Interceptor + Send + Sync>)
    }

    /// build_chain constructs a non-type erased Chain from an Interceptor registry.
    pub fn build_chain(&self, id: &str) -> Result<Chain> {
        if self.builders.is_empty() {
            return Ok(Chain::new(vec![Arc::new(NoOp)]));
        }

        let interceptors: Result<Vec<_>> = self.builders.iter().map(|b| b.build(id)).collect();

        Ok(Chain::new(interceptors?))
    }
}
