//! Scripted collaborators for tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use docqa_core::{
    Error, GenerationRequest, Passage, Result, SearchRequest, SimilaritySearchClient,
    TextGenerationClient,
};

/// One scripted generation reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Hang,
}

pub fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

/// Generation client that answers from a queue and records every request.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerationClient for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(s)) => Ok(s),
            Some(Reply::Fail) => Err(Error::Network("connection refused".to_string())),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
            None => Err(Error::Generation("script exhausted".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Search client with separate answers for thresholded and unthresholded calls.
pub struct ScriptedSearch {
    pub thresholded: Vec<Passage>,
    pub unthresholded: Vec<Passage>,
    pub unreachable: bool,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedSearch {
    pub fn new(thresholded: Vec<Passage>, unthresholded: Vec<Passage>) -> Self {
        Self {
            thresholded,
            unthresholded,
            unreachable: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Same passages regardless of threshold.
    pub fn always(passages: Vec<Passage>) -> Self {
        Self::new(passages.clone(), passages)
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new(Vec::new(), Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SimilaritySearchClient for ScriptedSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Passage>> {
        self.requests.lock().unwrap().push(request.clone());
        if self.unreachable {
            return Err(Error::SimilaritySearch("index offline".to_string()));
        }
        Ok(match request.similarity_threshold {
            Some(_) => self.thresholded.clone(),
            None => self.unthresholded.clone(),
        })
    }
}

/// Passages named `p0`, `p1`, ... with descending scores.
pub fn passages(n: usize) -> Vec<Passage> {
    (0..n)
        .map(|i| Passage::new(format!("p{i}")).with_score(1.0 - i as f32 * 0.05))
        .collect()
}

pub fn contents(passages: &[Passage]) -> Vec<String> {
    passages.iter().map(|p| p.content.clone()).collect()
}
