use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::application::{Application, ApplicationStatus};
use super::domain::{ApplicationId, DriveId, OfferId, StudentId, StudentSnapshot};
use super::drive::Drive;
use super::offer::{Offer, OfferStatus};
use super::repository::{
    NotificationPublisher, NotifyError, PlacementEvent, PlacementRepository, RepositoryError,
};

/// In-process repository backing the server binary and the test suites.
/// All maps share one mutex so the compare-and-swap saves are atomic with
/// respect to concurrent transitions.
#[derive(Default)]
pub struct InMemoryPlacementRepository {
    inner: Mutex<Stores>,
}

#[derive(Default)]
struct Stores {
    students: HashMap<StudentId, StudentSnapshot>,
    placements: HashMap<StudentId, DriveId>,
    drives: HashMap<DriveId, Drive>,
    applications: HashMap<ApplicationId, Application>,
    offers: HashMap<OfferId, Offer>,
}

impl InMemoryPlacementRepository {
    fn stores(&self) -> Result<MutexGuard<'_, Stores>, RepositoryError> {
        self.inner
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    /// The drive a student accepted an offer from, if any.
    pub fn placed_drive(&self, student: &StudentId) -> Option<DriveId> {
        self.inner
            .lock()
            .ok()
            .and_then(|stores| stores.placements.get(student).cloned())
    }
}

impl PlacementRepository for InMemoryPlacementRepository {
    fn find_student(&self, id: &StudentId) -> Result<Option<StudentSnapshot>, RepositoryError> {
        Ok(self.stores()?.students.get(id).cloned())
    }

    fn upsert_student(&self, snapshot: StudentSnapshot) -> Result<(), RepositoryError> {
        self.stores()?
            .students
            .insert(snapshot.student.clone(), snapshot);
        Ok(())
    }

    fn find_drive(&self, id: &DriveId) -> Result<Option<Drive>, RepositoryError> {
        Ok(self.stores()?.drives.get(id).cloned())
    }

    fn insert_drive(&self, drive: Drive) -> Result<(), RepositoryError> {
        let mut stores = self.stores()?;
        if stores.drives.contains_key(&drive.id) {
            return Err(RepositoryError::Conflict);
        }
        stores.drives.insert(drive.id.clone(), drive);
        Ok(())
    }

    fn save_drive(&self, drive: Drive) -> Result<(), RepositoryError> {
        let mut stores = self.stores()?;
        if !stores.drives.contains_key(&drive.id) {
            return Err(RepositoryError::NotFound);
        }
        stores.drives.insert(drive.id.clone(), drive);
        Ok(())
    }

    fn find_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.stores()?.applications.get(id).cloned())
    }

    fn insert_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut stores = self.stores()?;
        if stores.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        let duplicate = stores.applications.values().any(|existing| {
            existing.drive == application.drive && existing.student == application.student
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        stores
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    fn save_application(
        &self,
        application: Application,
        expected_prior: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        let mut stores = self.stores()?;
        let stored = stores
            .applications
            .get(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected_prior {
            return Err(RepositoryError::PreconditionFailed {
                expected: expected_prior.label(),
            });
        }
        stores
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    fn application_for(
        &self,
        drive: &DriveId,
        student: &StudentId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .stores()?
            .applications
            .values()
            .find(|application| &application.drive == drive && &application.student == student)
            .cloned())
    }

    fn applications_for_drive(
        &self,
        drive: &DriveId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let mut applications: Vec<Application> = self
            .stores()?
            .applications
            .values()
            .filter(|application| &application.drive == drive)
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.applied_at.cmp(&b.applied_at));
        Ok(applications)
    }

    fn find_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        Ok(self.stores()?.offers.get(id).cloned())
    }

    fn insert_offer(&self, offer: Offer) -> Result<(), RepositoryError> {
        let mut stores = self.stores()?;
        if stores.offers.contains_key(&offer.id) {
            return Err(RepositoryError::Conflict);
        }
        stores.offers.insert(offer.id.clone(), offer);
        Ok(())
    }

    fn save_offer(
        &self,
        offer: Offer,
        expected_prior: OfferStatus,
    ) -> Result<(), RepositoryError> {
        let mut stores = self.stores()?;
        let stored = stores.offers.get(&offer.id).ok_or(RepositoryError::NotFound)?;
        if stored.status != expected_prior {
            return Err(RepositoryError::PreconditionFailed {
                expected: expected_prior.label(),
            });
        }
        stores.offers.insert(offer.id.clone(), offer);
        Ok(())
    }

    fn pending_offer_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Option<Offer>, RepositoryError> {
        Ok(self
            .stores()?
            .offers
            .values()
            .find(|offer| {
                &offer.application == application && offer.status == OfferStatus::Pending
            })
            .cloned())
    }

    fn offers_for_application(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        let mut offers: Vec<Offer> = self
            .stores()?
            .offers
            .values()
            .filter(|offer| &offer.application == application)
            .cloned()
            .collect();
        offers.sort_by(|a, b| a.issued_at.cmp(&b.issued_at));
        Ok(offers)
    }

    fn offers_for_drive(&self, drive: &DriveId) -> Result<Vec<Offer>, RepositoryError> {
        let mut offers: Vec<Offer> = self
            .stores()?
            .offers
            .values()
            .filter(|offer| &offer.drive == drive)
            .cloned()
            .collect();
        offers.sort_by(|a, b| a.issued_at.cmp(&b.issued_at));
        Ok(offers)
    }

    fn mark_placed(&self, student: &StudentId, drive: &DriveId) -> Result<(), RepositoryError> {
        let mut stores = self.stores()?;
        if !stores.students.contains_key(student) {
            return Err(RepositoryError::NotFound);
        }
        stores.placements.insert(student.clone(), drive.clone());
        Ok(())
    }
}

/// Notification adapter that writes events to the log stream. Stands in for
/// the e-mail dispatcher in local runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationPublisher for TracingNotifier {
    fn publish(&self, event: PlacementEvent) -> Result<(), NotifyError> {
        tracing::info!(?event, "placement event");
        Ok(())
    }
}
