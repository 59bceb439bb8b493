use engine::{
    load_level, resolve_app_paths, ImageLoader, LevelError, LoopConfig, MetricsHandle, Scene,
    StartupError, TilemapError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::call::{CallNegotiator, UnavailableMedia};
use super::client::ClientState;
use super::config::ClientConfig;
use super::net::{NetworkChannel, TcpLineTransport};
use super::office_scene::OfficeScene;
use super::session::{EnvSessionProvider, RoomStore, SessionProvider, ACCESS_TOKEN_ENV_VAR};
use super::world::{WorldImages, WorldTree};

const HERO_SHEET_KEY: &str = "hero";
const SHADOW_KEY: &str = "shadow";
const ROOM_FILE: &str = "room.json";

#[derive(Debug, Error)]
pub(crate) enum ClientStartupError {
    #[error(transparent)]
    Paths(#[from] StartupError),
    #[error("no session token; set {env_var} to the bearer token issued at sign-in")]
    NoSession { env_var: &'static str },
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error("failed to start image loader: {0}")]
    ImageLoader(#[source] std::io::Error),
    #[error("level tile layer is invalid: {0}")]
    Tilemap(#[from] TilemapError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) metrics: MetricsHandle,
    /// Kept alive for the whole run; dropping it stops the loader thread.
    pub(crate) images: ImageLoader,
}

pub(crate) fn build_app() -> Result<AppWiring, ClientStartupError> {
    init_tracing();
    info!("=== Office Startup ===");

    let config = ClientConfig::from_env();
    build_app_with(&config, &EnvSessionProvider)
}

fn build_app_with(
    config: &ClientConfig,
    session: &dyn SessionProvider,
) -> Result<AppWiring, ClientStartupError> {
    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        server = config.server_addr.as_str(),
        scale = config.render_scale,
        "client_config"
    );

    let jwt = session
        .access_token()
        .ok_or(ClientStartupError::NoSession {
            env_var: ACCESS_TOKEN_ENV_VAR,
        })?;
    let room_id = RoomStore::new(paths.cache_dir.join(ROOM_FILE)).resolve(config.room_id.as_deref());

    let level = load_level(&paths.assets_dir, &config.level)?;
    let mut images =
        ImageLoader::spawn(paths.sprites_dir()).map_err(ClientStartupError::ImageLoader)?;
    let world_images = WorldImages {
        hero: images.request(HERO_SHEET_KEY),
        shadow: images.request(SHADOW_KEY),
        tileset: images.request(&level.tileset),
        sky: level.sky.as_deref().map(|key| images.request(key)),
    };

    let loop_config = LoopConfig::default();
    let world = WorldTree::new(
        &level,
        world_images,
        config.render_scale,
        (loop_config.buffer_width, loop_config.buffer_height),
    )?;
    let calls = CallNegotiator::new(
        Box::new(UnavailableMedia),
        Box::new(UnavailableMedia),
        config.call_timeout,
    );
    let state = ClientState::new(world, calls, jwt, room_id);

    let channel = match TcpLineTransport::connect(&config.server_addr, config.connect_timeout) {
        Ok(transport) => NetworkChannel::new(Box::new(transport)),
        Err(error) => {
            // Offline play still works; nothing is sent.
            warn!(error = %error, "server_unreachable_running_offline");
            NetworkChannel::offline()
        }
    };

    let metrics = MetricsHandle::default();
    let scene = OfficeScene::new(state, channel).with_loop_metrics(metrics.clone());

    Ok(AppWiring {
        config: loop_config,
        scene: Box::new(scene),
        metrics,
        images,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
