use std::sync::Arc;

use cache::InMemoryCache;
use dao_impl_sqlite::{
    availability_slot::AvailabilitySlotDaoImpl, client::ClientDaoImpl, session::SessionDaoImpl,
    weekly_pattern::WeeklyPatternDaoImpl, TransactionDaoImpl, TransactionImpl,
};
use service_impl::availability_slot::{QueryFacadeServiceDeps, SlotGeneratorServiceDeps};
use service_impl::coherence::{CoherenceServiceDeps, CoherenceServiceImpl};
use service_impl::collaborators::{LoggingNotifier, NoMeetingProvisioner, StaticConsultantDirectory};
use service_impl::session::BookingServiceDeps;
use service_impl::weekly_pattern::WeeklyPatternServiceDeps;
use sqlx::SqlitePool;
#[cfg(feature = "json_logging")]
use tracing_subscriber::fmt::format::FmtSpan;

type Transaction = TransactionImpl;
type TransactionDao = TransactionDaoImpl;
type WeeklyPatternDao = WeeklyPatternDaoImpl;
type AvailabilitySlotDao = AvailabilitySlotDaoImpl;
type ClientDao = ClientDaoImpl;
type SessionDao = SessionDaoImpl;

type Cache = InMemoryCache;
type ClockService = service_impl::clock::ClockServiceImpl;
type ConfigService = service_impl::config::ConfigServiceImpl;
type UuidService = service_impl::uuid_service::UuidServiceImpl;
type Notifier = LoggingNotifier;
type MeetingProvisioner = NoMeetingProvisioner;
type ConsultantDirectory = StaticConsultantDirectory;

pub struct CoherenceServiceDependencies;
impl CoherenceServiceDeps for CoherenceServiceDependencies {
    type Cache = Cache;
    type ClockService = ClockService;
}
type CoherenceService = CoherenceServiceImpl<CoherenceServiceDependencies>;

pub struct WeeklyPatternServiceDependencies;
impl WeeklyPatternServiceDeps for WeeklyPatternServiceDependencies {
    type Transaction = Transaction;
    type WeeklyPatternDao = WeeklyPatternDao;
    type AvailabilitySlotDao = AvailabilitySlotDao;
    type TransactionDao = TransactionDao;
    type Cache = Cache;
    type ClockService = ClockService;
    type ConfigService = ConfigService;
    type CoherenceService = CoherenceService;
    type UuidService = UuidService;
}
type WeeklyPatternService = service_impl::weekly_pattern::WeeklyPatternServiceImpl<WeeklyPatternServiceDependencies>;

pub struct SlotGeneratorServiceDependencies;
impl SlotGeneratorServiceDeps for SlotGeneratorServiceDependencies {
    type Transaction = Transaction;
    type WeeklyPatternDao = WeeklyPatternDao;
    type AvailabilitySlotDao = AvailabilitySlotDao;
    type TransactionDao = TransactionDao;
    type ConfigService = ConfigService;
}
type SlotGeneratorService = service_impl::availability_slot::SlotGeneratorServiceImpl<SlotGeneratorServiceDependencies>;

pub struct QueryFacadeServiceDependencies;
impl QueryFacadeServiceDeps for QueryFacadeServiceDependencies {
    type Transaction = Transaction;
    type AvailabilitySlotDao = AvailabilitySlotDao;
    type TransactionDao = TransactionDao;
    type Cache = Cache;
    type ClockService = ClockService;
    type ConfigService = ConfigService;
    type ConsultantDirectory = ConsultantDirectory;
}
type QueryFacadeService = service_impl::availability_slot::QueryFacadeServiceImpl<QueryFacadeServiceDependencies>;

pub struct BookingServiceDependencies;
impl BookingServiceDeps for BookingServiceDependencies {
    type Transaction = Transaction;
    type ConsultantDirectory = ConsultantDirectory;
    type ClientDao = ClientDao;
    type SessionDao = SessionDao;
    type AvailabilitySlotDao = AvailabilitySlotDao;
    type TransactionDao = TransactionDao;
    type ClockService = ClockService;
    type UuidService = UuidService;
    type CoherenceService = CoherenceService;
    type Notifier = Notifier;
    type MeetingProvisioner = MeetingProvisioner;
}
type BookingService = service_impl::session::BookingServiceImpl<BookingServiceDependencies>;

#[derive(Clone)]
pub struct RestStateImpl {
    weekly_pattern_service: Arc<WeeklyPatternService>,
    slot_generator_service: Arc<SlotGeneratorService>,
    query_facade_service: Arc<QueryFacadeService>,
    booking_service: Arc<BookingService>,
    consultant_directory: Arc<ConsultantDirectory>,
}

impl rest::RestStateDef for RestStateImpl {
    type WeeklyPatternService = WeeklyPatternService;
    type SlotGeneratorService = SlotGeneratorService;
    type QueryFacadeService = QueryFacadeService;
    type BookingService = BookingService;
    type ConsultantDirectory = ConsultantDirectory;

    fn backend_version(&self) -> Arc<str> {
        Arc::from(env!("CARGO_PKG_VERSION"))
    }
    fn weekly_pattern_service(&self) -> Arc<Self::WeeklyPatternService> {
        self.weekly_pattern_service.clone()
    }
    fn slot_generator_service(&self) -> Arc<Self::SlotGeneratorService> {
        self.slot_generator_service.clone()
    }
    fn query_facade_service(&self) -> Arc<Self::QueryFacadeService> {
        self.query_facade_service.clone()
    }
    fn booking_service(&self) -> Arc<Self::BookingService> {
        self.booking_service.clone()
    }
    fn consultant_directory(&self) -> Arc<Self::ConsultantDirectory> {
        self.consultant_directory.clone()
    }
}

impl RestStateImpl {
    pub fn new(pool: Arc<sqlx::Pool<sqlx::Sqlite>>) -> Self {
        let transaction_dao = Arc::new(TransactionDaoImpl::new(pool.clone()));
        let weekly_pattern_dao = Arc::new(WeeklyPatternDaoImpl::new(pool.clone(), transaction_dao.clone()));
        let availability_slot_dao = Arc::new(AvailabilitySlotDaoImpl::new(pool.clone(), transaction_dao.clone()));
        let client_dao = Arc::new(ClientDaoImpl::new(pool.clone(), transaction_dao.clone()));
        let session_dao = Arc::new(SessionDaoImpl::new(pool.clone(), transaction_dao.clone()));

        let cache = Arc::new(InMemoryCache::default());
        let clock_service = Arc::new(service_impl::clock::ClockServiceImpl);
        let config_service = Arc::new(service_impl::config::ConfigServiceImpl);
        let uuid_service = Arc::new(service_impl::uuid_service::UuidServiceImpl);
        let notifier = Arc::new(LoggingNotifier);
        let meeting_provisioner = Arc::new(NoMeetingProvisioner);
        let consultant_directory = Arc::new(StaticConsultantDirectory::from_env());

        let coherence_service = Arc::new(CoherenceServiceImpl::new(cache.clone(), clock_service.clone()));

        let weekly_pattern_service = Arc::new(service_impl::weekly_pattern::WeeklyPatternServiceImpl {
            weekly_pattern_dao: weekly_pattern_dao.clone(),
            availability_slot_dao: availability_slot_dao.clone(),
            transaction_dao: transaction_dao.clone(),
            cache: cache.clone(),
            clock_service: clock_service.clone(),
            config_service: config_service.clone(),
            coherence_service: coherence_service.clone(),
            uuid_service: uuid_service.clone(),
        });

        let slot_generator_service = Arc::new(service_impl::availability_slot::SlotGeneratorServiceImpl {
            weekly_pattern_dao: weekly_pattern_dao.clone(),
            availability_slot_dao: availability_slot_dao.clone(),
            transaction_dao: transaction_dao.clone(),
            config_service: config_service.clone(),
        });

        let query_facade_service = Arc::new(service_impl::availability_slot::QueryFacadeServiceImpl {
            availability_slot_dao: availability_slot_dao.clone(),
            transaction_dao: transaction_dao.clone(),
            cache: cache.clone(),
            clock_service: clock_service.clone(),
            config_service: config_service.clone(),
            consultant_directory: consultant_directory.clone(),
        });

        let booking_service = Arc::new(service_impl::session::BookingServiceImpl {
            consultant_directory: consultant_directory.clone(),
            client_dao: client_dao.clone(),
            session_dao: session_dao.clone(),
            availability_slot_dao: availability_slot_dao.clone(),
            transaction_dao: transaction_dao.clone(),
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
            coherence_service: coherence_service.clone(),
            notifier: notifier.clone(),
            meeting_provisioner: meeting_provisioner.clone(),
        });

        Self {
            weekly_pattern_service,
            slot_generator_service,
            query_facade_service,
            booking_service,
            consultant_directory,
        }
    }
}

#[tokio::main]
async fn main() {
    let version = env!("CARGO_PKG_VERSION");

    #[cfg(feature = "local_logging")]
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::TRACE)
        .pretty()
        .with_file(true)
        .finish();

    #[cfg(feature = "json_logging")]
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_span_list(true)
        .with_file(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    tracing::info!("Availability backend version: {}", version);
    dotenvy::dotenv().ok();
    let pool = Arc::new(
        SqlitePool::connect("sqlite:./localdb.sqlite3")
            .await
            .expect("Could not connect to database"),
    );

    // Apply SQLite-specific migrations
    sqlx::migrate!("../migrations/sqlite")
        .run(pool.as_ref())
        .await
        .expect("Failed to run migrations");

    let rest_state = RestStateImpl::new(pool.clone());

    rest::start_server(rest_state).await
}
