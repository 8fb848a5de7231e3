//! Pass-through stream stages: object counting and document materialization.
//!
//! A [`Stage`] consumes one item and produces zero or one item, or fails.
//! Stages chain with [`Stage::then`] and attach to a `futures` stream of
//! `Result` items with [`StageStreamExt::through`]; an `Err` item is the
//! stream's error channel and passes every later stage untouched.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{Stream, StreamExt};

use crate::error::PipelineError;

/// Plain, transport-ready record: column name to JSON value.
pub type PlainRecord = serde_json::Map<String, serde_json::Value>;

/// One step of a streaming pipeline.
pub trait Stage {
    type In;
    type Out;

    /// `Ok(None)` drops the item, `Err` routes it to the error channel.
    fn process(&mut self, item: Self::In) -> Result<Option<Self::Out>, PipelineError>;

    /// Feed this stage's output into `next`.
    fn then<N>(self, next: N) -> Chain<Self, N>
    where
        Self: Sized,
        N: Stage<In = Self::Out>,
    {
        Chain {
            first: self,
            second: next,
        }
    }
}

/// Two stages run back to back.
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Stage for Chain<A, B>
where
    A: Stage,
    B: Stage<In = A::Out>,
{
    type In = A::In;
    type Out = B::Out;

    fn process(&mut self, item: A::In) -> Result<Option<B::Out>, PipelineError> {
        match self.first.process(item)? {
            Some(mid) => self.second.process(mid),
            None => Ok(None),
        }
    }
}

/// Attach stages to a stream whose items are `Result<_, PipelineError>`.
pub trait StageStreamExt<T>: Stream<Item = Result<T, PipelineError>> {
    fn through<G>(self, mut stage: G) -> impl Stream<Item = Result<G::Out, PipelineError>>
    where
        Self: Sized,
        G: Stage<In = T>,
    {
        self.filter_map(move |item| {
            let out = match item {
                Ok(value) => stage.process(value).transpose(),
                Err(e) => Some(Err(e)),
            };
            std::future::ready(out)
        })
    }
}

impl<T, S> StageStreamExt<T> for S where S: Stream<Item = Result<T, PipelineError>> {}

/// Shared object counter, readable while the stream is running
pub type ObjectCount = Arc<AtomicU64>;

/// Counts every object that flows through it, forwarding it unchanged.
pub struct ObjectCounter<T> {
    count: ObjectCount,
    _item: PhantomData<fn(T) -> T>,
}

impl<T> ObjectCounter<T> {
    pub fn new() -> Self {
        Self {
            count: Arc::new(AtomicU64::new(0)),
            _item: PhantomData,
        }
    }

    /// Handle for reading the count from outside the stream.
    pub fn handle(&self) -> ObjectCount {
        self.count.clone()
    }

    pub fn object_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl<T> Default for ObjectCounter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Stage for ObjectCounter<T> {
    type In = T;
    type Out = T;

    fn process(&mut self, item: T) -> Result<Option<T>, PipelineError> {
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(Some(item))
    }
}

/// A persistence-layer document that can snapshot itself as a plain record.
pub trait Document {
    fn materialize(&self) -> Result<PlainRecord, PipelineError>;
}

/// Converts documents into plain records, one to one.
pub struct DocumentToObject<D> {
    _doc: PhantomData<fn(D)>,
}

impl<D> DocumentToObject<D> {
    pub fn new() -> Self {
        Self { _doc: PhantomData }
    }
}

impl<D> Default for DocumentToObject<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Document> Stage for DocumentToObject<D> {
    type In = D;
    type Out = PlainRecord;

    fn process(&mut self, doc: D) -> Result<Option<PlainRecord>, PipelineError> {
        doc.materialize().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use serde_json::json;

    struct Doc(serde_json::Value);

    impl Document for Doc {
        fn materialize(&self) -> Result<PlainRecord, PipelineError> {
            match &self.0 {
                serde_json::Value::Object(map) => Ok(map.clone()),
                other => Err(PipelineError::Materialize(format!("not an object: {other}"))),
            }
        }
    }

    struct RejectOdd;

    impl Stage for RejectOdd {
        type In = u32;
        type Out = u32;

        fn process(&mut self, n: u32) -> Result<Option<u32>, PipelineError> {
            if n % 2 == 1 {
                Err(PipelineError::Downstream(format!("odd: {n}")))
            } else {
                Ok(Some(n))
            }
        }
    }

    fn record(v: serde_json::Value) -> PlainRecord {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn materialize_between_counters() {
        let docs = vec![
            Doc(json!({"foo": "bar"})),
            Doc(json!({"foo": "baz", "n": 1})),
        ];
        let upstream = ObjectCounter::new();
        let downstream = ObjectCounter::new();
        let (up, down) = (upstream.handle(), downstream.handle());

        let out: Vec<PlainRecord> = stream::iter(docs.into_iter().map(Ok::<_, PipelineError>))
            .through(upstream)
            .through(DocumentToObject::new())
            .through(downstream)
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(out[0], record(json!({"foo": "bar"})));
        assert_eq!(out[1], record(json!({"foo": "baz", "n": 1})));
        assert_eq!(up.load(Ordering::Relaxed), 2);
        assert_eq!(down.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn materialize_failure_is_an_error_item() {
        let docs = vec![Doc(json!({"a": 1})), Doc(json!(42)), Doc(json!({"b": 2}))];
        let out: Vec<Result<PlainRecord, PipelineError>> =
            stream::iter(docs.into_iter().map(Ok::<_, PipelineError>))
                .through(DocumentToObject::new())
                .collect()
                .await;

        assert_eq!(out.len(), 3);
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(PipelineError::Materialize(_))));
        assert!(out[2].is_ok());
    }

    #[tokio::test]
    async fn errors_pass_counter_uncounted() {
        let counter = ObjectCounter::new();
        let count = counter.handle();
        let items = vec![Ok(1u32), Err(PipelineError::Cancelled), Ok(2)];
        let out: Vec<_> = stream::iter(items).through(counter).collect().await;

        assert_eq!(out.len(), 3);
        assert!(out[1].is_err());
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn downstream_rejection_counted_once() {
        let counter = ObjectCounter::new();
        let count = counter.handle();
        let mut chain = counter.then(RejectOdd);

        assert_eq!(chain.process(2).unwrap(), Some(2));
        assert!(chain.process(3).is_err());
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn counter_forwards_unchanged() {
        let mut counter = ObjectCounter::new();
        let item = record(json!({"ID": "x"}));
        assert_eq!(counter.process(item.clone()).unwrap(), Some(item));
        assert_eq!(counter.object_count(), 1);
    }
}
