use anyhow::Result;
use clap::Parser;
use config::Config;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Deserializers, Root},
};
use server::Server;

mod auth;
mod config;
mod error;
mod io;
mod logging;
mod metrics;
mod net;
mod proto;
mod server;

fn init_logging() {
    if log4rs::init_file(config::LOG4RS_CONFIG_FILE_PATH, Deserializers::default()).is_ok() {
        return;
    }

    let stdout = ConsoleAppender::builder().build();
    let fallback = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .expect("fallback logging config is valid");

    log4rs::init_config(fallback).expect("no other logger is installed yet");
}

fn main() -> Result<()> {
    init_logging();

    let config = Config::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(worker_threads) = config.worker_threads() {
        runtime_builder.worker_threads(worker_threads);
    }
    let runtime = runtime_builder.enable_all().build()?;

    runtime.block_on(async move {
        let server = Server::bind(config).await?;
        server.run().await
    })
}
