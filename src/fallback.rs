//! Ordered fallback chains.
//!
//! A chain is a preference list, not a race: strategies run strictly one
//! after another and the first one that yields a value wins. A strategy
//! that declines, or runs past the chain's time budget, passes control to
//! the next one.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub trait FallbackStrategy<I, T>: Send + Sync {
    fn name(&self) -> &str;

    /// `None` means "declined"; implementations swallow their own errors
    fn attempt<'a>(&'a self, input: &'a I) -> BoxFuture<'a, Option<T>>;
}

impl<I, T, S> FallbackStrategy<I, T> for Arc<S>
where
    S: FallbackStrategy<I, T> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn attempt<'a>(&'a self, input: &'a I) -> BoxFuture<'a, Option<T>> {
        (**self).attempt(input)
    }
}

/// Value produced by a chain, tagged with the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: String,
}

pub struct FallbackChain<I, T> {
    strategies: Vec<Box<dyn FallbackStrategy<I, T>>>,
    budget: Option<Duration>,
}

impl<I, T> FallbackChain<I, T> {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
            budget: None,
        }
    }

    /// Per-strategy time budget; an attempt that exceeds it counts as declined
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn push(mut self, strategy: impl FallbackStrategy<I, T> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs the strategies in order; `None` only if every one declined
    pub async fn run(&self, input: &I) -> Option<Resolved<T>> {
        let total = self.strategies.len();
        for (i, strategy) in self.strategies.iter().enumerate() {
            debug!("Trying strategy {}/{}: {}", i + 1, total, strategy.name());

            let outcome = match self.budget {
                Some(budget) => match tokio::time::timeout(budget, strategy.attempt(input)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        debug!("⏱️  Strategy {} timed out after {:?}", strategy.name(), budget);
                        None
                    }
                },
                None => strategy.attempt(input).await,
            };

            match outcome {
                Some(value) => {
                    info!("✅ Strategy {} succeeded", strategy.name());
                    return Some(Resolved {
                        value,
                        source: strategy.name().to_string(),
                    });
                }
                None => debug!("Strategy {} declined", strategy.name()),
            }
        }
        None
    }
}

impl<I, T> Default for FallbackChain<I, T> {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Canned;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_first_success_wins_and_later_strategies_are_skipped() {
        let third = Canned::yields("third", "c");
        let third_calls = third.calls.clone();
        let chain: FallbackChain<(), String> = FallbackChain::new()
            .push(Canned::declines("first"))
            .push(Canned::yields("second", "b"))
            .push(third);

        let resolved = chain.run(&()).await.unwrap();
        assert_eq!(resolved.value, "b");
        assert_eq!(resolved.source, "second");
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_declined_is_none() {
        let chain: FallbackChain<(), String> = FallbackChain::new()
            .push(Canned::declines("a"))
            .push(Canned::declines("b"));
        assert!(chain.run(&()).await.is_none());
        assert!(FallbackChain::<(), String>::new().run(&()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_strategy_counts_as_declined() {
        let chain: FallbackChain<(), String> = FallbackChain::new()
            .with_budget(Duration::from_secs(10))
            .push(Canned::yields("slow", "late").slow(Duration::from_secs(30)))
            .push(Canned::yields("fast", "ok"));

        let resolved = chain.run(&()).await.unwrap();
        assert_eq!(resolved.source, "fast");
        assert_eq!(chain.names(), vec!["slow", "fast"]);
    }
}
