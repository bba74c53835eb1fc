use std::path::PathBuf;
use std::sync::{Arc, Weak};

use arbor_common::{Bounds, Color, EngineConfig};
use arbor_geometry::{GeometryArray, StripTable, Topology, TriangleView};
use arbor_resource::{ContextId, ContextRegistry, NativeHandle};
use arbor_scene::{
    BoundingLeaf, GeometryObject, Influence, Light, LightKind, NodeId, Scene, ShaderProgram,
    ShaderStage, Shape,
};
use arbor_traverse::{CullingCallback, Frustum, TraversalEngine, View};
use clap::{Parser, Subcommand, ValueEnum};
use glam::{Mat4, Vec3};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arbor-cli", about = "CLI tool for the arbor scene graph")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Engine config (YAML); defaults apply when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions and the active config
    Info,
    /// Build a sample scene and render frames for several contexts
    Demo {
        /// Number of frames to run
        #[arg(short, long, default_value = "6")]
        frames: u64,
        /// Number of render contexts
        #[arg(short = 'n', long, default_value = "2")]
        contexts: usize,
    },
    /// Print the triangle (or line) decomposition of a synthetic buffer
    Triangles {
        #[arg(short, long, value_enum, default_value = "list")]
        topology: TopologyArg,
        /// Number of vertices to generate
        #[arg(short = 'n', long, default_value = "9")]
        vertices: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TopologyArg {
    List,
    Strip,
    Fan,
    Quad,
    Lines,
    LineStrip,
}

impl TopologyArg {
    fn topology(self) -> Topology {
        match self {
            TopologyArg::List => Topology::TriangleList,
            TopologyArg::Strip => Topology::TriangleStrip(StripTable::single()),
            TopologyArg::Fan => Topology::TriangleFan(StripTable::single()),
            TopologyArg::Quad => Topology::QuadList,
            TopologyArg::Lines => Topology::LineList,
            TopologyArg::LineStrip => Topology::LineStrip(StripTable::single()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("arbor-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", arbor_common::crate_info());
            println!("geometry: {}", arbor_geometry::crate_info());
            println!("resource: {}", arbor_resource::crate_info());
            println!("scene: {}", arbor_scene::crate_info());
            println!("traverse: {}", arbor_traverse::crate_info());
            print!("{}", config.to_yaml_string()?);
        }
        Commands::Demo { frames, contexts } => run_demo(&config, frames, contexts)?,
        Commands::Triangles { topology, vertices } => {
            let positions = (0..vertices)
                .map(|i| Vec3::new((i / 2) as f32, (i % 2) as f32, 0.0))
                .collect();
            let array = GeometryArray::new(topology.topology(), positions)?;
            println!(
                "{}: {} vertices, {} triangles, {} lines",
                array.topology().name(),
                vertices,
                array.triangle_count(),
                array.line_count()
            );
            for i in 0..array.triangle_count() {
                if let Some(indices) = array.triangle_indices(i) {
                    println!("  triangle {i}: {indices:?}");
                }
            }
            for i in 0..array.line_count() {
                if let Some(indices) = array.line_indices(i) {
                    println!("  line {i}: {indices:?}");
                }
            }
        }
    }

    Ok(())
}

struct DemoScene {
    scene: Scene,
    row: NodeId,
    /// Geometry the demo edits halfway through. Owned by the scene.
    edited: Weak<GeometryObject>,
}

fn build_demo_scene(config: &EngineConfig) -> anyhow::Result<DemoScene> {
    let mut scene = Scene::with_config(config);
    let root = scene.root();

    let shader = Arc::new(ShaderProgram::new("flat"));
    shader.set_stage(ShaderStage::Vertex, "void main() {}");
    shader.set_stage(ShaderStage::Fragment, "void main() {}");

    let row = scene.create_ordered_group();
    scene.set_name(row, "row")?;
    scene.set_pickable(row, true)?;
    let mut edited = Weak::new();
    for i in 0..4 {
        let offset = Vec3::new(i as f32 * 3.0, 0.0, -5.0);
        let corners = vec![
            offset,
            offset + Vec3::X,
            offset + Vec3::Y,
            offset + Vec3::new(1.0, 1.0, 0.0),
        ];
        let geometry = GeometryObject::shared(GeometryArray::new(Topology::QuadList, corners)?);
        if i == 0 {
            edited = Arc::downgrade(&geometry);
        }
        let shape = scene.create_leaf(Shape::new(geometry).with_shader(shader.clone()));
        scene.attach(row, shape, i)?;
    }

    let far = scene.create_group();
    scene.set_name(far, "far")?;
    let distant = GeometryObject::shared(GeometryArray::new(
        Topology::TriangleFan(StripTable::single()),
        vec![
            Vec3::new(0.0, 0.0, -500.0),
            Vec3::new(1.0, 0.0, -500.0),
            Vec3::new(1.0, 1.0, -500.0),
            Vec3::new(0.0, 1.0, -500.0),
        ],
    )?);
    let distant_shape = scene.create_leaf(Shape::new(distant));
    scene.attach(far, distant_shape, 0)?;

    let region = scene.create_leaf(BoundingLeaf {
        region: Bounds::new(Vec3::splat(-20.0), Vec3::splat(20.0)),
    });
    let fog = scene.create_linear_fog(Color::new(0.6, 0.6, 0.7), 10.0, 100.0);
    let light = scene.create_leaf(Light {
        influence: Influence::Leaf(region),
        ..Light::new(LightKind::Directional { direction: Vec3::NEG_Y }, Color::WHITE)
    });

    for (i, child) in [region, fog, light, row, far].into_iter().enumerate() {
        scene.attach(root, child, i)?;
    }
    scene.update_bounds(root, false)?;
    tracing::info!(
        nodes = scene.len(),
        light_region = ?scene.effective_influence(light),
        "demo scene built"
    );
    Ok(DemoScene { scene, row, edited })
}

/// Register a handle for every resource the culling pass found missing.
fn upload_pending(
    scene: &Scene,
    culling: &CullingCallback,
    next_handle: &mut u64,
) -> anyhow::Result<usize> {
    let ctx = culling.context();
    let mut uploaded = 0;
    for &id in culling.uploads() {
        let Some(shape) = scene
            .node(id)
            .and_then(|node| node.as_leaf())
            .and_then(|leaf| leaf.as_shape())
        else {
            continue;
        };
        for resources in shape.resource_states() {
            if !resources.table().reference_exists(ctx) {
                *next_handle += 1;
                resources.table().register(ctx, NativeHandle(*next_handle))?;
                uploaded += 1;
            }
        }
    }
    Ok(uploaded)
}

fn run_demo(config: &EngineConfig, frames: u64, contexts: usize) -> anyhow::Result<()> {
    let DemoScene {
        mut scene,
        row,
        edited,
    } = build_demo_scene(config)?;
    let root = scene.root();

    let registry = ContextRegistry::new(config.max_render_contexts);
    let contexts: Vec<ContextId> = (0..contexts)
        .map(|_| registry.acquire())
        .collect::<Result<_, _>>()?;
    let mut engines: Vec<TraversalEngine> =
        contexts.iter().map(|_| TraversalEngine::new(config)).collect();

    let eye = Vec3::new(4.0, 1.0, 5.0);
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 100.0);
    let look = Mat4::look_at_rh(eye, Vec3::new(4.0, 0.0, -5.0), Vec3::Y);
    let view = View::at(eye).with_frustum(Frustum::from_view_projection(projection * look));

    let mut next_handle = 0;
    for frame in 0..frames {
        if frame == frames / 2 {
            if let Some(geometry) = edited.upgrade() {
                geometry.edit(|data| {
                    let lifted = data.vertex(0).map(|v| v + Vec3::Z * 0.5);
                    lifted.is_some_and(|v| data.write_vertex(0, v))
                });
                scene.update_bounds(root, true)?;
            }
        }
        for (ctx, engine) in contexts.iter().zip(engines.iter_mut()) {
            let mut culling = CullingCallback::new(*ctx);
            let completed = engine.run_frame(&scene, root, view, &mut culling);
            let uploaded = upload_pending(&scene, &culling, &mut next_handle)?;
            let stats = engine.stats();
            tracing::info!(
                frame = stats.frame_id,
                context = %ctx,
                completed,
                visible = culling.bin().shapes.len(),
                culled_groups = culling.groups_culled(),
                uploaded,
                stable = stats.stable_resources,
                "frame rendered"
            );
        }
        // Every context has synced this frame's data.
        scene.for_each_resource(root, |resources| resources.dirty().clear_dirty());
    }

    let teardown = scene.destroy(row)?;
    let mut reclaimed = 0;
    for resources in teardown.released_resources() {
        for ctx in &contexts {
            if let Some(handle) = resources.table().reclaim(*ctx) {
                tracing::debug!(context = %ctx, ?handle, "handle reclaimed");
                reclaimed += 1;
            }
        }
    }
    for ctx in contexts {
        registry.release(ctx);
    }
    println!(
        "demo: {} frames, {} contexts, removed {} nodes, released {} objects, reclaimed {}/{} handles",
        frames,
        engines.len(),
        teardown.nodes_removed,
        teardown.objects_released(),
        reclaimed,
        teardown.handles_marked
    );
    Ok(())
}
