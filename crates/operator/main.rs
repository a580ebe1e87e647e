use actix_web::{get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder};
use nginx_operator::controllers::nginxoperator_controller::{self, State};
use nginx_operator::util::{config::Config, telemetry};
use prometheus::{Encoder, TextEncoder};
use tracing::info;

#[get("/metrics")]
async fn metrics(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    match encoder.encode(&metrics, &mut buffer) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    telemetry::init(config.log_format).await?;

    info!("Starting nginx-operator");
    info!("  Template: {}", config.template);
    info!(
        "  Namespace: {}",
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );

    // Initialize Kubernetes controller state
    let state = State::default();
    let server_state = state.clone();

    // Start web server
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(server_state.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
            .service(metrics)
    })
    .bind(config.bind_address.as_str())?
    .shutdown_timeout(5)
    .run();

    // A controller that exits (signal or startup failure) takes the web server down with it
    let server_handle = server.handle();
    let controller = async move {
        let result = nginxoperator_controller::run(state, config).await;
        server_handle.stop(true).await;
        result
    };

    // Both runtimes implement graceful shutdown, so poll until both are done
    let (controller, server) = tokio::join!(controller, server);
    controller?;
    server?;
    Ok(())
}
