use super::domain::{Candidate, CandidateId, ClientId, ClientTerms, OfferId, OfferStatus};
use super::offer::Offer;
use super::safety::SafetyRecord;

/// How a commit writes the offer touched by a lifecycle event.
#[derive(Debug, Clone)]
pub enum OfferWrite {
    /// New offer; rejected if the candidate already has an active one.
    Insert(Offer),
    /// In-place update, applied only if the stored status still equals `expected_status`.
    Update {
        offer: Offer,
        expected_status: OfferStatus,
    },
}

/// How a commit writes the guarantee record.
#[derive(Debug, Clone)]
pub enum SafetyWrite {
    /// New record for the candidate; rejected while a previous one is still open.
    Open(SafetyRecord),
    Update(SafetyRecord),
}

/// Every record touched by one lifecycle event. Repositories apply it all or nothing.
#[derive(Debug, Clone)]
pub struct LifecycleCommit {
    pub candidate: Candidate,
    /// Stored candidate version the change was computed from.
    pub expected_version: u64,
    pub offer: Option<OfferWrite>,
    pub safety: Option<SafetyWrite>,
}

impl LifecycleCommit {
    pub fn candidate(candidate: Candidate) -> Self {
        let expected_version = candidate.version;
        Self {
            candidate,
            expected_version,
            offer: None,
            safety: None,
        }
    }

    pub fn with_offer(mut self, write: OfferWrite) -> Self {
        self.offer = Some(write);
        self
    }

    pub fn with_safety(mut self, write: SafetyWrite) -> Self {
        self.safety = Some(write);
        self
    }
}

/// Storage abstraction for candidates, offers, client terms and guarantee records.
///
/// `commit` must check every precondition carried by the [`LifecycleCommit`] and apply the
/// writes under the same lock or transaction; a failed check leaves storage untouched.
pub trait PlacementRepository: Send + Sync {
    fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, RepositoryError>;
    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError>;
    fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError>;
    fn active_offer(&self, candidate: &CandidateId) -> Result<Option<Offer>, RepositoryError>;
    fn offers_for(&self, candidate: &CandidateId) -> Result<Vec<Offer>, RepositoryError>;
    fn upsert_client(&self, client: ClientTerms) -> Result<(), RepositoryError>;
    fn fetch_client(&self, id: &ClientId) -> Result<Option<ClientTerms>, RepositoryError>;
    fn fetch_safety(&self, candidate: &CandidateId)
        -> Result<Option<SafetyRecord>, RepositoryError>;
    /// Guarantee records that are neither safe nor reneged.
    fn open_placements(&self) -> Result<Vec<SafetyRecord>, RepositoryError>;
    /// Apply the commit atomically and return the stored candidate with its new version.
    fn commit(&self, commit: LifecycleCommit) -> Result<Candidate, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
