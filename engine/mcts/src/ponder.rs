//! Background search.
//!
//! [`Ponder`] moves an [`MctsSearch`] onto a worker thread and runs one search
//! episode there, for example while the opponent is thinking. The foreground
//! keeps a [`StopToken`] and gets the search back from [`Ponder::stop`] or
//! [`Ponder::wait`] once the thread has been joined, so the tree is never read
//! while a round is in flight.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use engine_core::Position;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, warn};

use crate::config::MctsConfig;
use crate::evaluator::Evaluator;
use crate::node::NodeId;
use crate::search::{MctsSearch, SearchError};
use crate::stop::StopToken;

type PonderResult<P> = (MctsSearch<P>, Result<NodeId, SearchError>);

/// A search running on a background thread.
pub struct Ponder<P: Position> {
    stop: StopToken,
    handle: Option<JoinHandle<PonderResult<P>>>,
}

impl<P: Position> Ponder<P> {
    /// Start searching `position` in the background.
    pub fn start<E>(
        mut search: MctsSearch<P>,
        position: P,
        evaluator: Arc<E>,
        config: MctsConfig,
        mut rng: ChaCha20Rng,
    ) -> Self
    where
        E: Evaluator + ?Sized + 'static,
    {
        let stop = StopToken::new();
        let token = stop.clone();
        let handle = thread::spawn(move || {
            let result = search.run(&position, evaluator.as_ref(), &config, &mut rng, &token);
            (search, result)
        });
        debug!("ponder started");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Token that stops this search at its next round boundary.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Whether the background search has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the search and hand back the quiescent tree with its root.
    pub fn stop(self) -> Result<(MctsSearch<P>, NodeId), SearchError> {
        self.stop.stop();
        self.wait()
    }

    /// Wait for the search to finish its budget without stopping it.
    pub fn wait(mut self) -> Result<(MctsSearch<P>, NodeId), SearchError> {
        let handle = self.handle.take().ok_or(SearchError::PonderPanicked)?;
        let (search, result) = handle.join().map_err(|_| SearchError::PonderPanicked)?;
        debug!(rounds = search.stats().rounds, "ponder joined");
        result.map(|root| (search, root))
    }
}

impl<P: Position> Drop for Ponder<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.stop();
            if handle.join().is_err() {
                warn!("ponder thread panicked");
            }
        }
    }
}
