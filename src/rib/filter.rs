use std::fmt;
use std::sync::Arc;

use inetnum::addr::Prefix;

use crate::route::Path;

//------------ Filter --------------------------------------------------------

/// The outcome of running a path through a filter: the (possibly changed)
/// path, and whether it was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub path: Path,
    pub reject: bool,
}

impl Verdict {
    pub fn accept(path: Path) -> Self {
        Self {
            path,
            reject: false,
        }
    }

    pub fn reject(path: Path) -> Self {
        Self { path, reject: true }
    }
}

/// One step of a filter chain, e.g. a policy term.
pub trait Filter: Send + Sync {
    fn process(&self, prefix: &Prefix, path: Path) -> Verdict;
}

impl<F> Filter for F
where
    F: Fn(&Prefix, Path) -> Verdict + Send + Sync,
{
    fn process(&self, prefix: &Prefix, path: Path) -> Verdict {
        self(prefix, path)
    }
}

//------------ FilterChain ---------------------------------------------------

/// An ordered list of filters. A path runs through the filters in order,
/// each one seeing the output of the previous one, until one rejects it.
///
/// Chains are cheap to clone, the filters themselves are shared.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self { filters }
    }

    /// The chain that accepts every path unchanged.
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// A chain with one filter that rejects everything.
    pub fn reject_all() -> Self {
        Self::new(vec![Arc::new(|_: &Prefix, path: Path| {
            Verdict::reject(path)
        })])
    }

    pub fn push(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn process(&self, prefix: &Prefix, path: Path) -> Verdict {
        let mut verdict = Verdict::accept(path);
        for filter in &self.filters {
            verdict = filter.process(prefix, verdict.path);
            if verdict.reject {
                break;
            }
        }
        verdict
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilterChain({} filters)", self.filters.len())
    }
}
