use std::{pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};

use crate::transform::validate::ValidationFailure;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn now(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            payload: f(self.payload),
            received_at: self.received_at,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
    #[error("tariff {label} rejected: {reason}")]
    Rejected {
        label: String,
        reason: ValidationFailure,
    },
}

pub type ItemStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> ItemStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

/// Identity conversion for pipelines whose source already yields the sink's type.
#[derive(Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait::async_trait]
impl<T: Send + 'static> Transform<T, T> for Passthrough {
    async fn apply(&self, input: Envelope<T>) -> Result<Envelope<T>, PipelineError> {
        Ok(input)
    }
}

/// Source items are converted `I -> O`, then run through the same-type chain.
///
/// Up to `workers` items are in flight at once, each on its own task, and
/// results reach the sink in completion order. A failed item travels down the
/// stream as an `Err` and never stops the run.
pub struct Pipeline<S, I, O, K> {
    pub source: S,
    pub convert: Arc<dyn Transform<I, O> + Send + Sync>,
    pub transforms: Vec<Arc<dyn Transform<O, O> + Send + Sync>>,
    pub sink: K,
    pub workers: usize,
}

impl<S, I, O, K> Pipeline<S, I, O, K>
where
    I: Send + 'static,
    O: Send + 'static,
    S: Source<I> + Send + Sync + 'static,
    K: Sink<O> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<(), PipelineError> {
        let input = self.source.stream().await;
        let convert = self.convert;
        let transforms = Arc::new(self.transforms);

        let processed = input
            .map(move |item| {
                let convert = convert.clone();
                let transforms = transforms.clone();
                async move {
                    let handle = tokio::spawn(async move {
                        let mut env = convert.apply(item?).await?;
                        for t in transforms.iter() {
                            env = t.apply(env).await?;
                        }
                        Ok::<_, PipelineError>(env)
                    });
                    match handle.await {
                        Ok(res) => res,
                        Err(e) => Err(PipelineError::Transform(format!("worker task failed: {e}"))),
                    }
                }
            })
            .buffer_unordered(self.workers.max(1));

        self.sink.run(Box::pin(processed)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct VecSource(Vec<Result<i64, String>>);

    #[async_trait::async_trait]
    impl Source<i64> for VecSource {
        async fn stream(&self) -> ItemStream<i64> {
            let items: Vec<_> = self
                .0
                .iter()
                .cloned()
                .map(|r| r.map(Envelope::now).map_err(PipelineError::Source))
                .collect();
            Box::pin(futures::stream::iter(items))
        }
    }

    struct Doubler;

    #[async_trait::async_trait]
    impl Transform<i64, String> for Doubler {
        async fn apply(&self, input: Envelope<i64>) -> Result<Envelope<String>, PipelineError> {
            Ok(input.map(|v| (v * 2).to_string()))
        }
    }

    struct RejectOdd;

    #[async_trait::async_trait]
    impl Transform<i64, i64> for RejectOdd {
        async fn apply(&self, input: Envelope<i64>) -> Result<Envelope<i64>, PipelineError> {
            if input.payload % 2 == 0 {
                Ok(input)
            } else {
                Err(PipelineError::Transform(format!("{} is odd", input.payload)))
            }
        }
    }

    #[derive(Clone, Default)]
    struct Collect<T> {
        ok: Arc<Mutex<Vec<T>>>,
        errors: Arc<Mutex<usize>>,
    }

    #[async_trait::async_trait]
    impl<T: Send + 'static> Sink<T> for Collect<T> {
        async fn run<St>(&self, mut input: St) -> Result<(), PipelineError>
        where
            St: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static,
        {
            while let Some(item) = input.next().await {
                match item {
                    Ok(env) => self.ok.lock().unwrap().push(env.payload),
                    Err(_) => *self.errors.lock().unwrap() += 1,
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn converts_every_item() {
        let sink = Collect::<String>::default();
        let pipeline = Pipeline {
            source: VecSource(vec![Ok(1), Ok(2), Ok(3)]),
            convert: Arc::new(Doubler),
            transforms: vec![],
            sink: sink.clone(),
            workers: 2,
        };
        pipeline.run().await.unwrap();

        let mut got = sink.ok.lock().unwrap().clone();
        got.sort();
        assert_eq!(got, vec!["2", "4", "6"]);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_stream() {
        let sink = Collect::<i64>::default();
        let pipeline = Pipeline {
            source: VecSource(vec![Ok(2), Err("bad row".to_string()), Ok(3), Ok(4)]),
            convert: Arc::new(Passthrough),
            transforms: vec![Arc::new(RejectOdd)],
            sink: sink.clone(),
            workers: 4,
        };
        pipeline.run().await.unwrap();

        let mut got = sink.ok.lock().unwrap().clone();
        got.sort();
        assert_eq!(got, vec![2, 4]);
        assert_eq!(*sink.errors.lock().unwrap(), 2);
    }
}
