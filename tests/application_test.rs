//! Composition and lifecycle tests
//!
//! Module graph flattening, singleton identity, startup errors and the
//! init/destroy state machine.

use keystone::lifecycle::LifecycleState;
use keystone::prelude::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    fn push(&self, event: &str) {
        self.0.lock().unwrap().push(event.to_string());
    }

    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Injectable)]
#[lifecycle(init, destroy)]
pub struct Database {
    log: Arc<EventLog>,
}

#[async_trait]
impl OnModuleInit for Database {
    async fn on_module_init(&self) -> Result<(), LifecycleError> {
        self.log.push("init:database");
        Ok(())
    }
}

#[async_trait]
impl OnModuleDestroy for Database {
    async fn on_module_destroy(&self) -> Result<(), LifecycleError> {
        self.log.push("destroy:database");
        Ok(())
    }
}

#[derive(Injectable)]
#[lifecycle(init, destroy)]
pub struct Cache {
    log: Arc<EventLog>,
    _database: Arc<Database>,
}

#[async_trait]
impl OnModuleInit for Cache {
    async fn on_module_init(&self) -> Result<(), LifecycleError> {
        self.log.push("init:cache");
        Ok(())
    }
}

#[async_trait]
impl OnModuleDestroy for Cache {
    async fn on_module_destroy(&self) -> Result<(), LifecycleError> {
        self.log.push("destroy:cache");
        Err(LifecycleError::shutdown_failed("flush failed"))
    }
}

#[derive(Injectable)]
pub struct Counter {
    hits: AtomicUsize,
}

impl Counter {
    fn hit(&self) -> usize {
        self.hits.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[controller(path = "/health")]
pub struct HealthController {
    counter: Arc<Counter>,
}

#[routes]
impl HealthController {
    #[get]
    async fn check(&self) -> Result<Json<Value>, HttpException> {
        Ok(Json(json!({ "hits": self.counter.hit() })))
    }
}

#[module(providers = [Cache, Database])]
pub struct StorageModule;

#[module(imports = [StorageModule], controllers = [HealthController], providers = [Counter])]
pub struct AppModule;

#[module(controllers = [HealthController], providers = [Counter])]
pub struct MirrorModule;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn test_init_and_destroy_run_once_in_order() {
    init_tracing();
    let app = Application::builder::<AppModule>()
        .provide(EventLog::default())
        .build()
        .unwrap();
    let log = app.container().resolve::<EventLog>().unwrap();

    assert_eq!(app.state().await, LifecycleState::Unstarted);
    app.init().await.unwrap();
    app.init().await.unwrap();
    assert_eq!(app.state().await, LifecycleState::Initialized);

    assert_eq!(app.destroy().await, 1);
    assert_eq!(app.destroy().await, 0);
    assert_eq!(app.state().await, LifecycleState::Destroyed);

    assert_eq!(
        log.events(),
        vec!["init:database", "init:cache", "destroy:cache", "destroy:database"]
    );
}

#[tokio::test]
async fn test_init_constructs_imported_providers() {
    let app = Application::builder::<AppModule>()
        .provide(EventLog::default())
        .build()
        .unwrap();
    let database = keystone::Token::of::<Database>();
    assert!(!app.container().is_constructed(database));

    app.init().await.unwrap();

    assert!(app.container().is_constructed(database));
    let cache = app.container().resolve::<Cache>().unwrap();
    let again = app.container().resolve::<Cache>().unwrap();
    assert!(Arc::ptr_eq(&cache, &again));
}

#[tokio::test]
async fn test_applications_do_not_share_singletons() {
    let first = Application::create::<MirrorModule>().unwrap();
    let second = Application::create::<MirrorModule>().unwrap();
    let other_root = Application::builder::<AppModule>()
        .provide(EventLog::default())
        .build()
        .unwrap();

    let counter = first.container().resolve::<Counter>().unwrap();
    counter.hit();
    counter.hit();

    assert_eq!(second.container().resolve::<Counter>().unwrap().hit(), 1);
    assert_eq!(other_root.container().resolve::<Counter>().unwrap().hit(), 1);
    assert_eq!(counter.hit(), 3);
}

mod diamond {
    use super::*;

    #[derive(Injectable)]
    pub struct Pool;

    #[derive(Injectable)]
    pub struct Orders {
        pub pool: Arc<Pool>,
    }

    #[derive(Injectable)]
    pub struct Invoices {
        pub pool: Arc<Pool>,
    }

    #[module(providers = [Pool], exports = [Pool])]
    pub struct SharedModule;

    #[module(imports = [SharedModule], providers = [Orders])]
    pub struct OrdersModule;

    #[module(imports = [SharedModule], providers = [Invoices])]
    pub struct InvoicesModule;

    #[module(imports = [OrdersModule, InvoicesModule])]
    pub struct RootModule;
}

#[tokio::test]
async fn test_diamond_import_shares_one_instance() {
    let app = Application::create::<diamond::RootModule>().unwrap();
    app.init().await.unwrap();

    let orders = app.container().resolve::<diamond::Orders>().unwrap();
    let invoices = app.container().resolve::<diamond::Invoices>().unwrap();
    assert!(Arc::ptr_eq(&orders.pool, &invoices.pool));

    let pools = app
        .container()
        .construction_order()
        .into_iter()
        .filter(|token| *token == keystone::Token::of::<diamond::Pool>())
        .count();
    assert_eq!(pools, 1);
}

mod broken {
    use super::*;

    pub struct Mailer;

    #[controller(path = "/mail")]
    pub struct MailController {
        _mailer: Arc<Mailer>,
    }

    #[routes]
    impl MailController {}

    #[module(controllers = [MailController])]
    pub struct MissingModule;

    #[derive(Injectable)]
    pub struct Ping {
        _pong: Arc<Pong>,
    }

    #[derive(Injectable)]
    pub struct Pong {
        _ping: Arc<Ping>,
    }

    #[controller(path = "/ping")]
    pub struct PingController {
        _ping: Arc<Ping>,
    }

    #[routes]
    impl PingController {}

    #[module(controllers = [PingController], providers = [Ping, Pong])]
    pub struct CycleModule;
}

#[test]
fn test_unregistered_dependency_aborts_startup() {
    let err = Application::create::<broken::MissingModule>().err().unwrap();
    match err {
        KeystoneError::DependencyNotFound { type_name } => assert!(type_name.ends_with("Mailer")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_dependency_cycle_is_reported() {
    let err = Application::create::<broken::CycleModule>().err().unwrap();
    match err {
        KeystoneError::CircularDependency { cycle } => assert_eq!(cycle, "Ping -> Pong -> Ping"),
        other => panic!("unexpected error: {other}"),
    }
}

mod failing {
    use super::*;

    #[derive(Injectable)]
    #[lifecycle(init)]
    pub struct Broker {
        pub log: Arc<EventLog>,
    }

    #[async_trait]
    impl OnModuleInit for Broker {
        async fn on_module_init(&self) -> Result<(), LifecycleError> {
            Err(LifecycleError::init_failed("connection refused"))
        }
    }

    #[derive(Injectable)]
    #[lifecycle(init)]
    pub struct Consumer {
        pub log: Arc<EventLog>,
        pub _broker: Arc<Broker>,
    }

    #[async_trait]
    impl OnModuleInit for Consumer {
        async fn on_module_init(&self) -> Result<(), LifecycleError> {
            self.log.push("init:consumer");
            Ok(())
        }
    }

    #[module(providers = [Consumer, Broker])]
    pub struct QueueModule;
}

#[tokio::test]
async fn test_failing_init_hook_aborts_startup() {
    init_tracing();
    let app = Application::builder::<failing::QueueModule>()
        .provide(EventLog::default())
        .build()
        .unwrap();

    let err = app.init().await.unwrap_err();
    assert!(matches!(err, LifecycleError::HookFailed { ref service, .. } if service == "Broker"));

    let log = app.container().resolve::<EventLog>().unwrap();
    assert!(log.events().is_empty());
}
