use crate::sparql::error::QueryEvaluationError;
use futures::Stream;
use kgsql_model::Variable;
pub use sparesults::QuerySolution;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A stream over [`QuerySolution`]s.
///
/// Solutions produced by the database arrive through a bounded channel that is fed by the task
/// owning the read transaction. Dropping the stream stops that task and releases its connection.
pub struct QuerySolutionStream {
    /// The variables used in the query solutions.
    variables: Arc<[Variable]>,
    inner: SolutionSource,
}

enum SolutionSource {
    Channel(mpsc::Receiver<Result<QuerySolution, QueryEvaluationError>>),
    Buffered(std::vec::IntoIter<QuerySolution>),
}

impl QuerySolutionStream {
    pub(crate) fn from_channel(
        variables: Arc<[Variable]>,
        receiver: mpsc::Receiver<Result<QuerySolution, QueryEvaluationError>>,
    ) -> Self {
        Self {
            variables,
            inner: SolutionSource::Channel(receiver),
        }
    }

    /// A stream over solutions that are already in memory.
    pub fn from_solutions(variables: Arc<[Variable]>, solutions: Vec<QuerySolution>) -> Self {
        Self {
            variables,
            inner: SolutionSource::Buffered(solutions.into_iter()),
        }
    }

    /// A stream without any solution.
    pub fn empty(variables: Arc<[Variable]>) -> Self {
        Self::from_solutions(variables, Vec::new())
    }

    /// The variables used in the solutions.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        self.variables.as_ref()
    }

    /// Collects all remaining solutions, failing on the first error.
    pub async fn try_collect_to_vec(mut self) -> Result<Vec<QuerySolution>, QueryEvaluationError> {
        let mut result = Vec::new();
        while let Some(solution) = futures::StreamExt::next(&mut self).await {
            result.push(solution?);
        }
        Ok(result)
    }
}

impl Stream for QuerySolutionStream {
    type Item = Result<QuerySolution, QueryEvaluationError>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.inner {
            SolutionSource::Channel(receiver) => receiver.poll_recv(cx),
            SolutionSource::Buffered(solutions) => Poll::Ready(solutions.next().map(Ok)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            SolutionSource::Channel(_) => (0, None),
            SolutionSource::Buffered(solutions) => solutions.size_hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use kgsql_model::{Literal, NamedNode, Term};

    #[test]
    fn test_send_sync() {
        fn is_send_sync<T: Send + Sync>() {}
        is_send_sync::<QuerySolution>();
        fn is_send<T: Send>() {}
        is_send::<QuerySolutionStream>();
    }

    #[tokio::test]
    async fn channel_stream_ends_when_the_producer_is_done() {
        let variables: Arc<[Variable]> = Arc::new([Variable::new_unchecked("s")]);
        let (sender, receiver) = mpsc::channel(2);
        let mut stream = QuerySolutionStream::from_channel(Arc::clone(&variables), receiver);

        let term: Term = NamedNode::new_unchecked("http://example.com/a").into();
        sender
            .send(Ok(QuerySolution::from((Arc::clone(&variables), vec![Some(term.clone())]))))
            .await
            .unwrap();
        sender
            .send(Err(QueryEvaluationError::InternalError("boom".to_owned())))
            .await
            .unwrap();
        drop(sender);

        assert_eq!(stream.next().await.unwrap().unwrap().get("s"), Some(&term));
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn buffered_stream_returns_all_solutions() {
        let variables: Arc<[Variable]> = Arc::new([Variable::new_unchecked("o")]);
        let solutions = vec![
            QuerySolution::from((Arc::clone(&variables), vec![Some(Literal::from(1).into())])),
            QuerySolution::from((Arc::clone(&variables), vec![None])),
        ];
        let stream = QuerySolutionStream::from_solutions(variables, solutions);
        assert_eq!(stream.size_hint(), (2, Some(2)));

        let collected = stream.try_collect_to_vec().await.unwrap();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].get("o"), None);
    }
}
