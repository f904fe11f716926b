use std::{
    env,
    sync::{Arc, RwLock},
};

use log::{error, info};
use stopwatch::Stopwatch;
use tokio::{io, task};

use voxelcraft::{
    config::Config,
    game::{GameClient, HeadlessRenderer},
    server::ServerHandler,
    world::{gen::TerrainGenerator, sched::GenerationScheduler, BlockRegistry, ChunkPos, Dimension, Vec3f},
};

const CONFIG_PATH: &str = "voxelcraft.toml";

fn usage() {
    eprintln!("usage: voxelcraft server");
    eprintln!("       voxelcraft client <address> <username>");
}

async fn run_server(config: Config) -> io::Result<()> {
    let server_config = Arc::new(config.server);
    let generator = Arc::new(TerrainGenerator::new(config.world));
    let world = Arc::new(RwLock::new(Dimension::new()));

    let stopwatch = Stopwatch::start_new();
    let scheduler = GenerationScheduler::start(generator.clone(), server_config.gen_threads);
    let [x, y, z] = server_config.spawn;
    let spawn = ChunkPos::from_position(Vec3f::new(x, y, z));
    let radius = server_config.pregen_radius;
    let pregen_world = world.clone();
    let columns = task::spawn_blocking(move || scheduler.pregenerate(&pregen_world, spawn, radius))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    info!("Generated {} columns in {}ms", columns, stopwatch.elapsed_ms());

    let listener = ServerHandler::bind(&server_config).await?;
    let server = ServerHandler::start(
        server_config,
        world,
        generator,
        Arc::new(BlockRegistry::with_defaults()),
    );
    server.listen(listener).await
}

async fn run_client(config: Config, addr: &str, username: &str) -> io::Result<()> {
    let registry = Arc::new(BlockRegistry::with_defaults());
    let client = GameClient::connect(addr, username, &config.client, registry).await?;

    let mut renderer = HeadlessRenderer::new();
    client.run(&mut renderer).await?;
    info!(
        "Rendered {} faces in {} chunks before leaving",
        renderer.num_faces(),
        renderer.num_meshes()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let config = match Config::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return;
        }
    };

    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.iter().map(|s| s.as_str()).collect::<Vec<_>>().as_slice() {
        ["server"] => run_server(config).await,
        ["client", addr, username] => run_client(config, addr, username).await,
        _ => {
            usage();
            return;
        }
    };

    if let Err(err) = result {
        error!("{}", err);
    }
}
