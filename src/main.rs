use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use axum::Router;
use marquee::{
    application::{
        admins::AdminService,
        contact::ContactService,
        error::AppError,
        repos::{ContentStore, PrincipalsRepo},
        site,
        sync::ContentSynchronizer,
    },
    config::{self, StoreBackend},
    domain::principals::PrincipalLookup,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiRateLimiter, ApiState},
        memory::MemoryContentStore,
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const EXPORT_LOAD_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::GrantAdmin(args) => run_grant_admin(settings, args).await,
        config::Command::IssueToken(args) => run_issue_token(settings, args).await,
        config::Command::Export(args) => run_export(settings, args).await,
        config::Command::Import(args) => run_import(settings, args).await,
    }
}

/// Store handles resolved from the configured backend.
struct Backends {
    content: Option<Arc<dyn ContentStore>>,
    principals: Option<Arc<dyn PrincipalsRepo>>,
}

impl Backends {
    fn synchronizer(&self) -> ContentSynchronizer {
        match self.content.as_ref() {
            Some(store) => ContentSynchronizer::connect(Arc::clone(store)),
            None => ContentSynchronizer::offline(),
        }
    }

    fn admins(&self) -> Option<AdminService> {
        self.principals
            .as_ref()
            .map(|repo| AdminService::new(Arc::clone(repo)))
    }
}

async fn init_backends(settings: &config::Settings) -> Result<Backends, AppError> {
    match settings.store.backend {
        StoreBackend::Postgres => {
            let repositories = Arc::new(init_postgres(settings).await?);
            let content: Arc<dyn ContentStore> = repositories.clone();
            let principals: Arc<dyn PrincipalsRepo> = repositories;
            Ok(Backends {
                content: Some(content),
                principals: Some(principals),
            })
        }
        StoreBackend::Memory => {
            warn!(
                target = "marquee::bootstrap",
                "Using the in-memory content store; saved content is lost on exit"
            );
            Ok(Backends {
                content: Some(Arc::new(MemoryContentStore::new())),
                principals: None,
            })
        }
        StoreBackend::None => Ok(Backends {
            content: None,
            principals: None,
        }),
    }
}

async fn init_postgres(settings: &config::Settings) -> Result<PostgresRepositories, AppError> {
    let database_url = settings
        .store
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("store url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.store.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    let repositories = PostgresRepositories::new(pool);
    repositories
        .health_check()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(
        target = "marquee::bootstrap",
        max_connections = settings.store.max_connections.get(),
        "Connected to postgres content store"
    );
    Ok(repositories)
}

async fn require_admins(settings: &config::Settings) -> Result<AdminService, AppError> {
    init_backends(settings).await?.admins().ok_or_else(|| {
        AppError::validation(format!(
            "principals require the postgres store backend (configured: {})",
            settings.store.backend.as_str()
        ))
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let backends = init_backends(&settings).await?;
    let content = Arc::new(backends.synchronizer());
    let admins = backends.admins().map(Arc::new);
    if admins.is_none() {
        warn!(
            target = "marquee::bootstrap",
            "Principals store not configured; admin routes are disabled"
        );
    }

    let state = ApiState {
        content: Arc::clone(&content),
        contact: Arc::new(ContactService::new(backends.content.clone())),
        admins,
        rate_limiter: Arc::new(ApiRateLimiter::new(
            Duration::from_secs(settings.rate_limit.window_seconds.get().into()),
            settings.rate_limit.max_requests.get(),
        )),
    };

    let result = serve_http(&settings, http::build_router(state)).await;
    content.shutdown();
    result
}

async fn run_grant_admin(
    settings: config::Settings,
    args: config::GrantAdminArgs,
) -> Result<(), AppError> {
    let lookup = match (args.email, args.uid) {
        (Some(email), _) => PrincipalLookup::Email(email),
        (None, Some(uid)) => PrincipalLookup::Id(uid),
        (None, None) => return Err(AppError::validation("either --email or --uid is required")),
    };

    let admins = require_admins(&settings).await?;
    let record = admins.grant_admin(lookup).await?;

    println!("Granted admin claim to {} ({})", record.email, record.id);
    Ok(())
}

async fn run_issue_token(
    settings: config::Settings,
    args: config::IssueTokenArgs,
) -> Result<(), AppError> {
    let admins = require_admins(&settings).await?;
    let issued = admins.issue_token(&args.email).await?;

    println!("Token for {} ({}):", issued.record.email, issued.record.id);
    println!("{}", issued.token);
    println!("Store it now; it cannot be shown again.");
    Ok(())
}

async fn run_export(settings: config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    let synchronizer = init_backends(&settings).await?.synchronizer();
    let path = args.file;

    info!(
        target = "marquee::export",
        path = %path.display(),
        backend = synchronizer.backend(),
        "Starting export"
    );

    let view = tokio::time::timeout(EXPORT_LOAD_TIMEOUT, synchronizer.loaded())
        .await
        .map_err(|_| AppError::unexpected("timed out waiting for live content"))?;
    if let Some(message) = view.error.as_deref() {
        warn!(target = "marquee::export", error = message, "Exporting with fallback content");
    }

    site::export_content(&view, &path).await?;
    synchronizer.shutdown();
    info!(target = "marquee::export", "Export completed");
    Ok(())
}

async fn run_import(settings: config::Settings, args: config::ImportArgs) -> Result<(), AppError> {
    let synchronizer = init_backends(&settings).await?.synchronizer();
    let path = args.file;

    info!(
        target = "marquee::import",
        path = %path.display(),
        backend = synchronizer.backend(),
        "Starting import"
    );

    let outcome = site::import_content(&synchronizer, &path).await;
    synchronizer.shutdown();
    let outcome = outcome?;

    if let Some(warning) = outcome.warning.as_deref() {
        warn!(target = "marquee::import", warning, "Import saved with warning");
    }
    info!(
        target = "marquee::import",
        case_studies = outcome.content.work.case_studies.len(),
        "Import completed"
    );
    Ok(())
}

async fn serve_http(settings: &config::Settings, router: Router) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "marquee::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        wait_for_shutdown_signal().await;
        let _ = signalled_tx.send(());
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut server => return server_result(joined),
        _ = signalled_rx => {}
    }

    info!(
        target = "marquee::http",
        grace_seconds = settings.server.graceful_shutdown.as_secs(),
        "Shutdown requested; draining connections"
    );
    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => server_result(joined),
        Err(_) => {
            warn!(
                target = "marquee::http",
                "Graceful shutdown timed out; closing remaining connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "marquee::http",
            error = %err,
            "Failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
