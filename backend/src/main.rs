mod app_state;
mod auth;
mod config;
mod db;
mod error;
mod job_controller;
mod massadmin;
mod services;
#[cfg(test)]
mod test_support;

use crate::app_state::AppState;
use crate::config::Config;
use crate::job_controller::state::JobsState;
use crate::massadmin::dispatcher::ChannelQueue;
use crate::massadmin::registry::ModelRegistry;
use crate::massadmin::worker::{self, Worker};
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(io::Error::other)?;
    let registry = ModelRegistry::from_file(&config.registry).map_err(io::Error::other)?;
    {
        let conn = db::open(&config.database).map_err(io::Error::other)?;
        db::init_schema(&conn).map_err(io::Error::other)?;
    }
    info!(
        "{} model(s) registered from {}, database {}",
        registry.len(),
        config.registry.display(),
        config.database.display()
    );

    let config = Arc::new(config);
    let registry = Arc::new(registry);

    // Initialize job controller state
    let (tx, rx) = mpsc::channel(100);
    let jobs_state = JobsState::new(tx.clone());

    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    // Start the mass edit worker
    let (job_tx, job_rx) = mpsc::unbounded_channel();
    let mass_edit_worker = Worker::new(
        registry.clone(),
        config.database.clone(),
        config.strategy,
        tx.clone(),
    );
    tokio::spawn(async move {
        worker::start_worker(mass_edit_worker, job_rx).await;
    });

    let app_state = AppState {
        config: config.clone(),
        registry,
        queue: Arc::new(ChannelQueue::new(job_tx, tx)),
    };

    let (host, port) = config.bind_address();
    info!(
        "Server running at http://{}:{}{} ({:?} worker)",
        host, port, config.mount, config.strategy
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .service(services::massadmin::configure_routes(&app_state.config.mount))
            .service(services::jobs::configure_routes())
    })
    .bind((host, port))?
    .run()
    .await
}
