//! Connection-bound result cursor

use crate::database::{DocumentStream, EngineConnection};
use crate::error::Result;
use bson::Document as BsonDocument;
use futures::future::BoxFuture;
use futures::{ready, FutureExt, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Lazily iterated query results together with the connection that produced them
///
/// The connection is released exactly once: when the results are exhausted,
/// on [`DocumentCursor::close`], or when the cursor is dropped, whichever
/// comes first. Exhaustion and `close` wait for the release to finish; a
/// dropped cursor hands the release to the current tokio runtime.
pub struct DocumentCursor<C: EngineConnection> {
    connection: Option<C>,
    stream: Option<DocumentStream>,
    closing: Option<BoxFuture<'static, ()>>,
    collection: String,
}

impl<C: EngineConnection> DocumentCursor<C> {
    pub fn new(connection: C, stream: DocumentStream, collection: impl Into<String>) -> Self {
        Self {
            connection: Some(connection),
            stream: Some(stream),
            closing: None,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Whether the underlying connection is still held or being released
    pub fn is_open(&self) -> bool {
        self.connection.is_some() || self.closing.is_some()
    }

    /// Fetch the next document, `None` once exhausted
    pub async fn next_document(&mut self) -> Option<Result<BsonDocument>> {
        self.next().await
    }

    /// Drain the remaining documents; stops at the first error
    pub async fn try_collect_all(mut self) -> Result<Vec<BsonDocument>> {
        let mut documents = Vec::new();
        while let Some(item) = self.next().await {
            documents.push(item?);
        }
        Ok(documents)
    }

    /// Release the connection without reading further
    pub async fn close(mut self) {
        self.begin_release();
        if let Some(closing) = self.closing.take() {
            closing.await;
        }
    }

    fn begin_release(&mut self) {
        // the stream may hold its own handle on the connection
        self.stream.take();
        if let Some(connection) = self.connection.take() {
            tracing::debug!(collection = %self.collection, "releasing cursor connection");
            self.closing = Some(connection.close());
        }
    }
}

impl<C: EngineConnection> Unpin for DocumentCursor<C> {}

impl<C: EngineConnection> Stream for DocumentCursor<C> {
    type Item = Result<BsonDocument>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(stream) = this.stream.as_mut() {
            match stream.poll_next_unpin(cx) {
                Poll::Ready(None) => this.begin_release(),
                other => return other,
            }
        }

        if let Some(closing) = this.closing.as_mut() {
            ready!(closing.poll_unpin(cx));
            this.closing = None;
        }
        Poll::Ready(None)
    }
}

impl<C: EngineConnection> Drop for DocumentCursor<C> {
    fn drop(&mut self) {
        self.begin_release();
        let Some(closing) = self.closing.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(closing);
            }
            Err(_) => {
                tracing::warn!(
                    collection = %self.collection,
                    "cursor dropped outside a tokio runtime; connection dropped without close"
                );
            }
        }
    }
}

impl<C: EngineConnection> std::fmt::Debug for DocumentCursor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCursor")
            .field("collection", &self.collection)
            .field("open", &self.is_open())
            .finish()
    }
}
