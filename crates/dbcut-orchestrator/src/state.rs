/// The run state machine from spec §4.8:
///
/// ```text
/// INIT → REFLECTING → SCHEMA_READY →
///   (per plan: COMPILING → (CACHE_HIT | EXTRACTING → CACHING) → LOADING) →
/// DONE
/// ```
///
/// `Error` is reachable from any other state; transitioning into it rolls
/// back only the current plan, not prior committed plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Reflecting,
    SchemaReady,
    Compiling,
    CacheHit,
    Extracting,
    Caching,
    Loading,
    Done,
    Error,
}

impl RunState {
    /// Whether `self → next` is a legal transition. Exhaustive over every
    /// state pair the machine can reach; `Error` accepts a transition from
    /// anywhere.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        if next == Error {
            return true;
        }
        matches!(
            (self, next),
            (Init, Reflecting)
                | (Reflecting, SchemaReady)
                | (SchemaReady, Compiling)
                | (Compiling, CacheHit)
                | (Compiling, Extracting)
                | (Extracting, Caching)
                | (CacheHit, Loading)
                | (Caching, Loading)
                | (Loading, Compiling)
                | (Loading, Done)
        )
    }
}
