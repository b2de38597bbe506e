use std::sync::Arc;

use safar::config::Config;
use safar::engine::Engine;
use safar::notify::LogDispatcher;
use safar::pubsub::LocalChannel;
use safar::server::serve;
use safar::store::PgRideStore;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config = Config::from_env().unwrap();

    let store = PgRideStore::new(&config.database_url, config.max_connections)
        .await
        .unwrap();

    let addr = config.listen_addr;
    let engine = Engine::new(
        Arc::new(store),
        Arc::new(LocalChannel::new()),
        Arc::new(LogDispatcher),
        config,
    );

    serve(engine, addr).await;
}
