use crate::{
    config::ShopConfig,
    domain::{Appointment, BoardColumn, EntityKind, Lead},
    error::Result,
    events::EventBus,
    scheduling::AppointmentBook,
    stages::StageBoard,
    storage::DurableMedium,
    store::EntityStore,
};
use std::sync::Arc;

/// One store per entity kind sharing a single bus and medium.
///
/// Build it once at startup and hand clones of the store `Arc`s (or the
/// services from [`book`](Self::book) and [`board`](Self::board)) to whatever
/// needs them.
pub struct StoreRegistry {
    config: ShopConfig,
    bus: EventBus,
    appointments: Arc<EntityStore<Appointment>>,
    columns: Arc<EntityStore<BoardColumn>>,
    leads: Arc<EntityStore<Lead>>,
}

impl StoreRegistry {
    pub fn new(medium: Arc<dyn DurableMedium>, config: ShopConfig) -> Result<Self> {
        config.validate()?;
        let bus = EventBus::new();

        let appointments = Arc::new(EntityStore::new(
            config.storage_key(EntityKind::Appointment),
            Arc::clone(&medium),
            bus.clone(),
        ));
        let columns = Arc::new(EntityStore::new(
            config.storage_key(EntityKind::BoardColumn),
            Arc::clone(&medium),
            bus.clone(),
        ));
        let leads = Arc::new(EntityStore::new(
            config.storage_key(EntityKind::Lead),
            medium,
            bus.clone(),
        ));

        tracing::info!(namespace = %config.namespace, "store registry ready");
        Ok(Self {
            config,
            bus,
            appointments,
            columns,
            leads,
        })
    }

    /// Registry over JSON files in `config.data_dir`
    #[cfg(feature = "file-storage")]
    pub fn open(config: ShopConfig) -> Result<Self> {
        let medium = Arc::new(crate::storage::FileMedium::new(&config.data_dir));
        Self::new(medium, config)
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn appointments(&self) -> &Arc<EntityStore<Appointment>> {
        &self.appointments
    }

    pub fn columns(&self) -> &Arc<EntityStore<BoardColumn>> {
        &self.columns
    }

    pub fn leads(&self) -> &Arc<EntityStore<Lead>> {
        &self.leads
    }

    pub fn book(&self) -> AppointmentBook {
        AppointmentBook::new(
            Arc::clone(&self.appointments),
            self.config.business_hours.clone(),
        )
    }

    /// Board whose column removal migrates leads and appointments
    pub fn board(&self) -> StageBoard {
        StageBoard::new(Arc::clone(&self.columns))
            .with_dependents(self.leads.clone())
            .with_dependents(self.appointments.clone())
    }
}
