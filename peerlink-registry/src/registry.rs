//! The registry facade tying the stores and the cascade together.

use crate::cascade::{CascadeEngine, CascadeReport, RetryPolicy};
use crate::collaborators::{PictureStore, ProfilePictures, TransferGroupDirectory};
use crate::config::RegistryConfig;
use crate::error::RegistryResult;
use peerlink_blobstore::BlobStore;
use peerlink_storage::{
    now_millis, picture_id_for, CascadeJournal, Connection, ConnectionKey, ConnectionStore,
    Database, Device, DeviceStore, TransferStore,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Known remote devices, their connections, and the cleanup that follows
/// their removal.
pub struct DeviceRegistry {
    devices: DeviceStore,
    connections: ConnectionStore,
    transfers: TransferStore,
    journal: CascadeJournal,
    pictures: ProfilePictures,
    cascade: CascadeEngine,
}

impl DeviceRegistry {
    /// Opens the registry described by `config`.
    pub fn open(config: &RegistryConfig) -> RegistryResult<Self> {
        config.validate()?;
        let database = match &config.database_path {
            Some(path) => {
                info!("opening device registry at {}", path.display());
                Database::open(path, &config.memory_limit, config.threads)?
            }
            None => Database::open_in_memory()?,
        };
        Self::from_database(database, config)
    }

    /// Opens an in-memory registry with default settings (for testing).
    pub fn open_in_memory() -> RegistryResult<Self> {
        Self::open(&RegistryConfig::default())
    }

    fn from_database(database: Database, config: &RegistryConfig) -> RegistryResult<Self> {
        let blobs = BlobStore::open_with_conn(database.shared_connection())?;
        let pictures = Arc::new(ProfilePictures::new(blobs, config.picture_namespace.clone()));
        let groups = Arc::new(TransferStore::new(database.clone()));
        Self::with_collaborators(database, groups, pictures, config)
    }

    /// Builds a registry whose cascade cleans up through the given
    /// transfer-group directory and picture store.
    ///
    /// Devices, connections and the journal always live in `database`.
    /// [`transfers`](Self::transfers) and the picture accessors also use
    /// `database`, whatever collaborators are passed in.
    pub fn with_collaborators(
        database: Database,
        groups: Arc<dyn TransferGroupDirectory>,
        pictures: Arc<dyn PictureStore>,
        config: &RegistryConfig,
    ) -> RegistryResult<Self> {
        config.validate()?;
        let connections = ConnectionStore::new(database.clone());
        let cascade = CascadeEngine::new(
            connections.clone(),
            groups,
            pictures,
            RetryPolicy::from(config),
        );

        let blobs = BlobStore::open_with_conn(database.shared_connection())?;
        Ok(Self {
            devices: DeviceStore::new(database.clone()),
            connections,
            transfers: TransferStore::new(database.clone()),
            journal: CascadeJournal::new(database),
            pictures: ProfilePictures::new(blobs, config.picture_namespace.clone()),
            cascade,
        })
    }

    // -- Devices --

    pub fn upsert_device(&self, device: &Device) -> RegistryResult<()> {
        self.devices.upsert(device)?;
        debug!("stored device {}", device.id);
        Ok(())
    }

    /// Gets a device, failing with a not-found error if it is unknown.
    pub fn get_device(&self, id: &str) -> RegistryResult<Device> {
        Ok(self.devices.get(id)?)
    }

    pub fn find_device(&self, id: &str) -> RegistryResult<Option<Device>> {
        Ok(self.devices.find(id)?)
    }

    pub fn list_devices(&self) -> RegistryResult<Vec<Device>> {
        Ok(self.devices.list()?)
    }

    /// Marks a device as seen now. Returns false if it is unknown.
    pub fn touch_device(&self, id: &str) -> RegistryResult<bool> {
        Ok(self.devices.touch(id, now_millis())?)
    }

    /// Removes a device and everything that depends on it.
    ///
    /// The device row is deleted and the id journaled in one transaction;
    /// only a failure there is returned as an error. Cleanup failures are
    /// reported through [`CascadeReport::failures`] and leave the journal
    /// entry in place for [`resume_pending_cascades`](Self::resume_pending_cascades).
    /// Removing an unknown or already-removed device succeeds.
    pub fn remove_device(&self, id: &str) -> RegistryResult<CascadeReport> {
        let existed = self.devices.remove_and_journal(id, now_millis())?;
        if !existed {
            debug!("device {id} not present, cleaning up leftovers only");
        }

        let mut report = self.cascade.on_device_removed(id);
        report.device_existed = existed;
        self.settle_journal(&report);
        Ok(report)
    }

    /// Re-runs cleanup for every device whose cascade did not finish.
    ///
    /// Devices that were registered again since their removal are dropped
    /// from the journal without cleanup, since their current connections
    /// and assignments are live.
    pub fn resume_pending_cascades(&self) -> RegistryResult<Vec<CascadeReport>> {
        let pending = self.journal.pending()?;
        if !pending.is_empty() {
            info!("resuming {} pending cascade(s)", pending.len());
        }

        let mut reports = Vec::with_capacity(pending.len());
        for device_id in pending {
            if self.devices.find(&device_id)?.is_some() {
                debug!("device {device_id} was registered again, dropping pending cascade");
                self.journal.clear(&device_id)?;
                continue;
            }
            let report = self.cascade.on_device_removed(&device_id);
            self.settle_journal(&report);
            reports.push(report);
        }
        Ok(reports)
    }

    fn settle_journal(&self, report: &CascadeReport) {
        if report.is_partial() {
            return;
        }
        // A stale entry only causes a redundant, idempotent re-run later.
        if let Err(e) = self.journal.clear(&report.device_id) {
            warn!("failed to clear cascade journal for {}: {e}", report.device_id);
        }
    }

    // -- Connections --

    pub fn upsert_connection(&self, connection: &Connection) -> RegistryResult<()> {
        Ok(self.connections.upsert(connection)?)
    }

    pub fn connection(&self, key: &ConnectionKey) -> RegistryResult<Option<Connection>> {
        Ok(self.connections.get(key)?)
    }

    pub fn connections_for_device(&self, device_id: &str) -> RegistryResult<Vec<Connection>> {
        Ok(self.connections.find_by_device(device_id)?)
    }

    // -- Profile pictures --

    pub fn save_picture(&self, device_id: &str, data: &[u8]) -> RegistryResult<()> {
        Ok(self.pictures.save(&picture_id_for(device_id), data)?)
    }

    /// The device's profile picture, if one was saved.
    pub fn picture(&self, device_id: &str) -> RegistryResult<Option<Vec<u8>>> {
        match self.pictures.read(&picture_id_for(device_id)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // -- Store access --

    pub fn devices(&self) -> &DeviceStore {
        &self.devices
    }

    pub fn connections(&self) -> &ConnectionStore {
        &self.connections
    }

    /// Transfer groups and assignees, owned by the transfer subsystem.
    pub fn transfers(&self) -> &TransferStore {
        &self.transfers
    }

    pub fn journal(&self) -> &CascadeJournal {
        &self.journal
    }
}
