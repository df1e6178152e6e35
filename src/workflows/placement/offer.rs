use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::application::{Application, ApplicationStatus};
use super::domain::{ApplicationId, DriveId, OfferId, PlacementError, StudentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Countered,
    Expired,
}

impl OfferStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Countered => "countered",
            OfferStatus::Expired => "expired",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, OfferStatus::Pending)
    }
}

/// Student's counter-proposal attached to a countered offer. The company
/// resolves it with a fresh offer or a rejection; the countered offer itself
/// never reopens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterProposal {
    pub compensation: u64,
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

/// A compensation proposal issued to a student after selection. Expiry is a
/// data-driven deadline checked lazily on every response attempt, so the
/// contract holds without any background sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub application: ApplicationId,
    pub student: StudentId,
    pub drive: DriveId,
    pub status: OfferStatus,
    pub compensation: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub counter: Option<CounterProposal>,
    pub response_message: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Offer {
    /// Issue the first offer for an application. Only a `selected`
    /// application can receive one.
    pub fn issue(
        id: OfferId,
        application: &Application,
        compensation: u64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, PlacementError> {
        if application.status != ApplicationStatus::Selected {
            return Err(PlacementError::ApplicationNotSelected {
                status: application.status.label(),
            });
        }

        Ok(Self::build(id, application, compensation, issued_at, expires_at))
    }

    /// Issue a replacement offer after a counter or expiry. The application
    /// already sits in `offer_issued`; the caller is responsible for checking
    /// that no pending offer remains.
    pub fn reissue(
        id: OfferId,
        application: &Application,
        compensation: u64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, PlacementError> {
        if application.status != ApplicationStatus::OfferIssued {
            return Err(PlacementError::ApplicationNotSelected {
                status: application.status.label(),
            });
        }

        Ok(Self::build(id, application, compensation, issued_at, expires_at))
    }

    fn build(
        id: OfferId,
        application: &Application,
        compensation: u64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            application: application.id.clone(),
            student: application.student.clone(),
            drive: application.drive.clone(),
            status: OfferStatus::Pending,
            compensation,
            issued_at,
            expires_at,
            counter: None,
            response_message: None,
            responded_at: None,
        }
    }

    /// Lazily resolve a lapsed deadline. Returns true when this call flipped
    /// the offer to `expired`, which the caller must persist.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == OfferStatus::Pending && now > self.expires_at {
            self.status = OfferStatus::Expired;
            return true;
        }
        false
    }

    pub fn accept(
        &mut self,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), PlacementError> {
        self.ensure_pending(now, OfferStatus::Accepted)?;
        self.status = OfferStatus::Accepted;
        self.response_message = message;
        self.responded_at = Some(now);
        Ok(())
    }

    pub fn reject(
        &mut self,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), PlacementError> {
        self.ensure_pending(now, OfferStatus::Rejected)?;
        self.status = OfferStatus::Rejected;
        self.response_message = message;
        self.responded_at = Some(now);
        Ok(())
    }

    pub fn counter(
        &mut self,
        compensation: u64,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), PlacementError> {
        self.ensure_pending(now, OfferStatus::Countered)?;
        self.status = OfferStatus::Countered;
        self.counter = Some(CounterProposal {
            compensation,
            message,
            at: now,
        });
        self.responded_at = Some(now);
        Ok(())
    }

    /// Every response path goes through here: a lapsed deadline flips the
    /// offer to `expired` before the attempt is refused, and anything other
    /// than a pending offer refuses the transition outright.
    fn ensure_pending(
        &mut self,
        now: DateTime<Utc>,
        attempted: OfferStatus,
    ) -> Result<(), PlacementError> {
        if self.expire_if_due(now) || self.status == OfferStatus::Expired {
            return Err(PlacementError::OfferExpired {
                expired_at: self.expires_at,
            });
        }

        if self.status != OfferStatus::Pending {
            return Err(PlacementError::InvalidTransition {
                from: self.status.label(),
                to: attempted.label(),
            });
        }

        Ok(())
    }
}
