use futures::stream::FuturesUnordered;

use crate::service::Service;

pub mod web;

pub fn run(
    web: &web::Config,
    service: Service,
) -> FuturesUnordered<tokio::task::JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>>
{
    let futures = FuturesUnordered::new();

    futures.push(tokio::spawn(web::start(web.listen_addr, service)));

    futures
}
