use std::collections::HashSet;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::http;
use crate::types::TrackId;

/// Longest description accepted, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 50;

/// Outcome of a classification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Matching ids in the collaborator's order.
    Matched(Vec<TrackId>),
    /// Nothing matched: the caller should ask for a different description.
    NoMatches,
}

/// The classification collaborator: which candidate tracks fit a description.
///
/// Implementations only transport the request; validation and filtering are
/// done by [`ClassificationRequester`].
///
/// # Example
///
/// ```rust,ignore
/// impl Classifier for StaticClassifier {
///     async fn classify(&self, text: &str, song_list: &[TrackId]) -> Result<Vec<TrackId>, Error> {
///         Ok(song_list.iter().take(3).cloned().collect())
///     }
/// }
/// ```
pub trait Classifier: Send + Sync + 'static {
    /// Returns the matched ids; an empty vec means no match.
    fn classify(
        &self,
        text: &str,
        song_list: &[TrackId],
    ) -> impl Future<Output = Result<Vec<TrackId>, Error>> + Send;
}

/// HTTP classification service: `POST {text, song_list}` → `{tracks}`.
pub struct HttpClassifier {
    http: reqwest::Client,
    url: Url,
}

#[derive(Serialize)]
struct ClassifyBody<'a> {
    text: &'a str,
    song_list: &'a [TrackId],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    tracks: Option<Vec<TrackId>>,
}

impl HttpClassifier {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }
}

impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str, song_list: &[TrackId]) -> Result<Vec<TrackId>, Error> {
        let response: ClassifyResponse = http::send_json(
            self.http
                .post(self.url.clone())
                .json(&ClassifyBody { text, song_list }),
            "classification",
        )
        .await
        .map_err(collaborator_error)?;
        Ok(response.tracks.unwrap_or_default())
    }
}

/// A 401 from the classifier is not the user's session expiring.
fn collaborator_error(e: Error) -> Error {
    match e {
        Error::Unauthorized { operation } => Error::Rejected {
            operation,
            status: 401,
            detail: "classification service refused the request".into(),
        },
        e => e,
    }
}

/// Validates descriptions and normalizes collaborator output.
pub struct ClassificationRequester<C> {
    classifier: C,
}

impl<C: Classifier> ClassificationRequester<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Ask which of `candidates` match `text`.
    ///
    /// The result only contains candidate ids, each once, in the collaborator's order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDescription`] before any network call when the trimmed
    /// text is empty or longer than [`MAX_DESCRIPTION_LEN`]; otherwise the
    /// collaborator's error.
    pub async fn classify(
        &self,
        text: &str,
        candidates: &[TrackId],
    ) -> Result<Classification, Error> {
        let text = validate_description(text)?;

        let matched = self.classifier.classify(text, candidates).await?;
        let returned = matched.len();

        let allowed: HashSet<&TrackId> = candidates.iter().collect();
        let mut seen = HashSet::with_capacity(matched.len());
        let matched: Vec<TrackId> = matched
            .into_iter()
            .filter(|id| allowed.contains(id) && seen.insert(id.clone()))
            .collect();
        debug!(
            candidates = candidates.len(),
            returned,
            kept = matched.len(),
            "Classified tracks"
        );

        if matched.is_empty() {
            Ok(Classification::NoMatches)
        } else {
            Ok(Classification::Matched(matched))
        }
    }
}

/// Trims `text` and checks it is non-empty and at most [`MAX_DESCRIPTION_LEN`] characters.
///
/// # Errors
///
/// [`Error::InvalidDescription`] describing the violation.
pub fn validate_description(text: &str) -> Result<&str, Error> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidDescription("description is required".into()));
    }
    let len = text.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(Error::InvalidDescription(format!(
            "description is {len} characters, at most {MAX_DESCRIPTION_LEN} allowed"
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Records calls and answers with a fixed id list.
    struct FakeClassifier {
        calls: AtomicUsize,
        last_text: Mutex<Option<String>>,
        answer: Vec<TrackId>,
    }

    impl FakeClassifier {
        fn answering(ids: &[&str]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_text: Mutex::new(None),
                answer: ids.iter().map(|s| TrackId::from(*s)).collect(),
            }
        }
    }

    impl Classifier for FakeClassifier {
        async fn classify(
            &self,
            text: &str,
            _song_list: &[TrackId],
        ) -> Result<Vec<TrackId>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_text.lock().unwrap() = Some(text.to_string());
            Ok(self.answer.clone())
        }
    }

    fn ids(raw: &[&str]) -> Vec<TrackId> {
        raw.iter().map(|s| TrackId::from(*s)).collect()
    }

    #[tokio::test]
    async fn empty_description_fails_without_call() {
        let requester = ClassificationRequester::new(FakeClassifier::answering(&["a"]));

        for text in ["", "   "] {
            let err = requester.classify(text, &ids(&["a"])).await.unwrap_err();
            assert!(matches!(err, Error::InvalidDescription(_)));
        }
        assert_eq!(requester.classifier().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn too_long_description_fails_without_call() {
        let requester = ClassificationRequester::new(FakeClassifier::answering(&["a"]));

        let text = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        let err = requester.classify(&text, &ids(&["a"])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidDescription(_)));
        assert_eq!(requester.classifier().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fifty_characters_is_accepted() {
        let requester = ClassificationRequester::new(FakeClassifier::answering(&["a"]));

        // multi-byte characters count once each
        let text = "é".repeat(MAX_DESCRIPTION_LEN);
        let result = requester.classify(&text, &ids(&["a"])).await.unwrap();
        assert_eq!(result, Classification::Matched(ids(&["a"])));
    }

    #[tokio::test]
    async fn description_is_trimmed_before_sending() {
        let requester = ClassificationRequester::new(FakeClassifier::answering(&["a"]));

        requester.classify("  happy \n", &ids(&["a"])).await.unwrap();
        assert_eq!(
            requester.classifier().last_text.lock().unwrap().as_deref(),
            Some("happy")
        );
    }

    #[tokio::test]
    async fn empty_answer_is_no_matches() {
        let requester = ClassificationRequester::new(FakeClassifier::answering(&[]));

        let result = requester.classify("happy", &[]).await.unwrap();
        assert_eq!(result, Classification::NoMatches);
    }

    #[tokio::test]
    async fn answer_restricted_to_candidates_in_order() {
        let requester =
            ClassificationRequester::new(FakeClassifier::answering(&["c", "zz", "a", "c"]));

        let result = requester.classify("happy", &ids(&["a", "b", "c"])).await.unwrap();
        assert_eq!(result, Classification::Matched(ids(&["c", "a"])));
    }

    #[test]
    fn classifier_401_is_not_a_session_failure() {
        let err = collaborator_error(Error::Unauthorized {
            operation: "classification",
        });
        assert!(matches!(err, Error::Rejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn answer_outside_candidates_is_no_matches() {
        let requester = ClassificationRequester::new(FakeClassifier::answering(&["zz"]));

        let result = requester.classify("happy", &ids(&["a"])).await.unwrap();
        assert_eq!(result, Classification::NoMatches);
    }
}
