//! Adaptively refines a cube and writes the leaf patches of the hierarchy as
//! an OBJ to stdout.
use anyhow::Result;
use opensubdiv_adaptive::{far, osd};

fn main() -> Result<()> {
    env_logger::init();

    // Geomtry for a cube control polyhedron.
    let vertices = [
        -0.5, -0.5, 0.5, 0.5, -0.5, 0.5, -0.5, 0.5, 0.5, 0.5, 0.5, 0.5, -0.5, 0.5, -0.5, 0.5, 0.5,
        -0.5, -0.5, -0.5, -0.5, 0.5, -0.5, -0.5,
    ];
    let num_vertices = vertices.len() / 3;

    let verts_per_face = [4; 6];

    let vert_indices = [
        0, 1, 3, 2, 2, 3, 5, 4, 4, 5, 7, 6, 6, 7, 1, 0, 1, 7, 5, 3, 6, 0, 2, 4,
    ];

    // Create a refiner from a descriptor.
    let refiner = far::TopologyRefiner::new(
        far::TopologyDescriptor::new(num_vertices, &verts_per_face, &vert_indices)?,
        far::TopologyRefinerOptions::default(),
    )?;

    // Isolate the extraordinary corners up to level 3.
    let controller = osd::CpuComputeController::new();
    let mut mesh = osd::Mesh::<osd::CpuVertexBuffer, _, osd::CpuDrawContext>::new(
        &controller,
        refiner,
        3,
        0,
        3,
        osd::MeshOptions {
            adaptive: true,
            ..Default::default()
        },
    )?;

    for level in 0..=mesh.refiner().max_level() {
        let topology = mesh
            .refiner()
            .level(level)
            .ok_or(anyhow::anyhow!("No level {level}"))?;
        eprintln!(
            "level {}: {} vertices, {} faces",
            level,
            topology.vertex_count(),
            topology.face_count()
        );
    }

    mesh.update_vertex_buffer(&vertices, 0, num_vertices)?;
    mesh.refine()?;
    mesh.synchronize();

    println!("o adaptive_cube");

    // Print vertex positions.
    let positions = mesh
        .bind_vertex_buffer()
        .ok_or(anyhow::anyhow!("No vertex buffer"))?;
    for v in positions.as_slice().chunks(3) {
        println!("v {} {} {}", v[0], v[1], v[2]);
    }

    let draw_context = mesh
        .draw_context()
        .ok_or(anyhow::anyhow!("No draw context"))?;
    for array in draw_context.patch_arrays() {
        let cvs = array.descriptor.control_vertices_len();
        let indices = &draw_context.index_buffer()
            [array.index_base..array.index_base + array.patches_len * cvs];
        for patch in indices.chunks(cvs) {
            print!("f");
            for index in patch {
                print!(" {}", index + 1);
            }
            println!();
        }
    }

    Ok(())
}
