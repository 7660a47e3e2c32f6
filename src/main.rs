use dotenvy::dotenv;
use snafu::ResultExt;

use watchtrack::config::Config;
use watchtrack::error::{ApplicationError, InitialLoadSnafu};
use watchtrack::logger;
use watchtrack::repl;
use watchtrack::service::reconciler::Reconciler;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    let store = config.store();
    let Config {
        token,
        enrollment_id,
        ..
    } = config;

    let reconciler = Reconciler::load(store, token, enrollment_id)
        .await
        .context(InitialLoadSnafu)?;

    repl::start(&reconciler).await
}
