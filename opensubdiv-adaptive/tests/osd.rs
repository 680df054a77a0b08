//! Tests for the osd module.

use anyhow::Result;
use opensubdiv_adaptive::far::{self, KernelBatch, StencilTable};
use opensubdiv_adaptive::osd::{self, ComputeContext, ComputeController, MeshInterface};
use opensubdiv_adaptive::{Error, Index};

type CpuMesh<'a> = osd::Mesh<'a, osd::CpuVertexBuffer, osd::CpuComputeController, osd::CpuDrawContext>;

#[rustfmt::skip]
const CUBE_POSITIONS: [f32; 24] = [
    -0.5, -0.5,  0.5,
     0.5, -0.5,  0.5,
    -0.5,  0.5,  0.5,
     0.5,  0.5,  0.5,
    -0.5,  0.5, -0.5,
     0.5,  0.5, -0.5,
    -0.5, -0.5, -0.5,
     0.5, -0.5, -0.5,
];
const CUBE_VERTICES_PER_FACE: [u32; 6] = [4; 6];
#[rustfmt::skip]
const CUBE_FACE_VERTICES: [u32; 24] = [
    0, 1, 3, 2,
    2, 3, 5, 4,
    4, 5, 7, 6,
    6, 7, 1, 0,
    1, 7, 5, 3,
    6, 0, 2, 4,
];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cube_refiner() -> Result<far::TopologyRefiner> {
    Ok(far::TopologyRefiner::new(
        far::TopologyDescriptor::new(8, &CUBE_VERTICES_PER_FACE, &CUBE_FACE_VERTICES)?,
        far::TopologyRefinerOptions::default(),
    )?)
}

/// Two levels of one stencil each: vertex 2 is the average of vertices 0 and
/// 1, vertex 3 doubles vertex 2.
fn two_level_table() -> Result<StencilTable> {
    Ok(StencilTable::from_raw_parts(
        2,
        vec![2, 1],
        vec![Index(0), Index(1), Index(2)],
        vec![0.5, 0.5, 2.0],
        &[0, 1, 1],
    )?)
}

fn assert_close(a: &[f32], b: &[f32]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
    }
}

#[test]
fn test_buffer_descriptor() -> Result<()> {
    let desc = osd::BufferDescriptor::new(0, 3, 3)?;
    assert!(desc.is_valid());
    assert_eq!(desc, osd::BufferDescriptor::full(3));

    // The offset may point past the first vertex.
    let desc = osd::BufferDescriptor::new(8, 2, 6)?;
    assert_eq!(desc.local_offset(), 2);

    assert_eq!(
        osd::BufferDescriptor::new(0, 0, 3),
        Err(Error::InvalidBufferDescriptor {
            offset: 0,
            length: 0,
            stride: 3
        })
    );
    assert!(osd::BufferDescriptor::new(0, 4, 3).is_err());
    assert!(!osd::BufferDescriptor::default().is_valid());
    Ok(())
}

#[test]
fn test_cpu_vertex_buffer() -> Result<()> {
    let num_vertices = 8;
    let num_elements = 3;

    let buffer = osd::CpuVertexBuffer::new(num_elements, num_vertices)?;
    assert_eq!(buffer.elements_len(), num_elements);
    assert_eq!(buffer.vertices_len(), num_vertices);

    // Zero-initialized.
    let data = buffer.bind_cpu_buffer();
    assert_eq!(data.len(), num_vertices * num_elements);
    assert!(data.iter().all(|&v| v == 0.0));

    assert!(matches!(
        osd::CpuVertexBuffer::new(0, num_vertices),
        Err(Error::PreconditionViolated(_))
    ));
    Ok(())
}

#[test]
fn test_cpu_vertex_buffer_update() -> Result<()> {
    let mut buffer = osd::CpuVertexBuffer::new(3, 4)?;

    buffer.update_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 1, 2)?;
    assert_eq!(
        buffer.bind_cpu_buffer(),
        &[0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0, 0.0, 0.0]
    );

    let binding = osd::VertexBuffer::bind(&buffer);
    assert_eq!(binding.vertex(2), Some(&[4.0, 5.0, 6.0][..]));
    assert_eq!(binding.vertex(4), None);
    assert_eq!(binding.as_bytes().len(), 12 * 4);

    // Vertices 2..5 do not fit.
    let before = buffer.clone();
    assert_eq!(
        buffer.update_data(&[9.0; 9], 2, 3),
        Err(Error::IndexOutOfRange {
            component: "vertex",
            index: 4,
            len: 4
        })
    );
    assert_eq!(buffer, before);

    // Source too short.
    assert_eq!(
        buffer.update_data(&[9.0; 5], 0, 2),
        Err(Error::InvalidBufferSize {
            expected: 6,
            actual: 5
        })
    );
    assert_eq!(buffer, before);
    Ok(())
}

#[test]
fn test_cpu_vertex_buffer_update_with_huge_offsets() -> Result<()> {
    let mut buffer = osd::CpuVertexBuffer::new(3, 4)?;
    buffer.update_data(&CUBE_POSITIONS, 0, 4)?;
    let before = buffer.clone();

    assert_eq!(
        buffer.update_data(&[], usize::MAX, 2),
        Err(Error::IndexOutOfRange {
            component: "vertex",
            index: usize::MAX,
            len: 4
        })
    );
    assert!(matches!(
        buffer.update_data(&[], 1, usize::MAX),
        Err(Error::IndexOutOfRange { len: 4, .. })
    ));
    assert_eq!(buffer, before);

    let binding = osd::VertexBuffer::bind(&buffer);
    assert_eq!(binding.vertex(usize::MAX), None);
    assert_eq!(binding.vertex(usize::MAX / 2), None);
    Ok(())
}

#[test]
fn test_evaluate_stencils() -> Result<()> {
    init_logger();

    let mut refiner = cube_refiner()?;
    refiner.refine_uniform(far::UniformRefinementOptions {
        refinement_level: 1,
    })?;

    let stencil_table = far::StencilTable::new(
        &refiner,
        far::StencilTableOptions {
            generate_offsets: true,
            generate_intermediate_levels: false,
            ..Default::default()
        },
    )?;

    let mut src_buffer = osd::CpuVertexBuffer::new(3, 8)?;
    src_buffer.update_data(&CUBE_POSITIONS, 0, 8)?;
    let mut dst_buffer = osd::CpuVertexBuffer::new(3, stencil_table.len())?;

    let desc = osd::BufferDescriptor::new(0, 3, 3)?;
    osd::cpu_evaluator::evaluate_stencils(&src_buffer, desc, &mut dst_buffer, desc, &stencil_table)?;

    let refined = dst_buffer.bind_cpu_buffer();
    // Face point of the +z face.
    assert_close(&refined[0..3], &[0.0, 0.0, 0.5]);
    // Edge point between vertices 0 and 1.
    assert_close(&refined[18..21], &[0.0, -0.5, 0.5]);
    // Vertex point of vertex 0.
    assert_close(&refined[54..57], &CUBE_POSITIONS[0..3]);

    // Mismatched element counts.
    assert!(matches!(
        osd::cpu_evaluator::evaluate_stencils(
            &src_buffer,
            desc,
            &mut dst_buffer,
            osd::BufferDescriptor::new(0, 2, 3)?,
            &stencil_table
        ),
        Err(Error::InvalidBufferSize { .. })
    ));

    // Destination too small.
    let mut small = osd::CpuVertexBuffer::new(3, 4)?;
    assert!(matches!(
        osd::cpu_evaluator::evaluate_stencils(&src_buffer, desc, &mut small, desc, &stencil_table),
        Err(Error::InvalidBufferSize { .. })
    ));
    Ok(())
}

#[test]
fn test_compute_batches_in_order() -> Result<()> {
    let table = two_level_table()?;
    let context = osd::CpuComputeContext::from_stencil_table(&table)?;
    assert_eq!(context.stencils_len(), 2);

    let batches = KernelBatch::from_stencil_table(&table);
    assert_eq!(
        batches,
        [
            KernelBatch {
                level: 1,
                start: 0,
                end: 1
            },
            KernelBatch {
                level: 2,
                start: 1,
                end: 2
            },
        ]
    );

    let controller = osd::CpuComputeController::new();

    let mut buffer = osd::CpuVertexBuffer::new(1, 4)?;
    buffer.update_data(&[2.0, 4.0], 0, 2)?;
    controller.compute(&context, &batches, Some(&mut buffer), None)?;
    assert_eq!(buffer.bind_cpu_buffer(), &[2.0, 4.0, 3.0, 6.0]);

    // Level 2 reads vertex 2 before level 1 has written it.
    let mut buffer = osd::CpuVertexBuffer::new(1, 4)?;
    buffer.update_data(&[2.0, 4.0], 0, 2)?;
    let reversed: Vec<_> = batches.iter().rev().copied().collect();
    controller.compute(&context, &reversed, Some(&mut buffer), None)?;
    assert_eq!(buffer.bind_cpu_buffer(), &[2.0, 4.0, 3.0, 0.0]);
    Ok(())
}

#[test]
fn test_compute_rejects_bad_input() -> Result<()> {
    // A stencil reading the vertex it computes.
    let table = StencilTable::from_raw_parts(2, vec![1], vec![Index(2)], vec![1.0], &[0, 1])?;
    assert!(matches!(
        osd::CpuComputeContext::from_stencil_table(&table),
        Err(Error::InvalidStencilTable(_))
    ));

    let table = two_level_table()?;
    let context = osd::CpuComputeContext::from_stencil_table(&table)?;
    let controller = osd::CpuComputeController::new();
    let mut buffer = osd::CpuVertexBuffer::new(1, 4)?;

    // A batch straddling two levels.
    let straddling = [KernelBatch {
        level: 1,
        start: 0,
        end: 2,
    }];
    assert!(matches!(
        controller.compute(&context, &straddling, Some(&mut buffer), None),
        Err(Error::PreconditionViolated(_))
    ));

    // No stencils for level 0.
    let control = [KernelBatch {
        level: 0,
        start: 0,
        end: 0,
    }];
    assert!(matches!(
        controller.compute(&context, &control, Some(&mut buffer), None),
        Err(Error::PreconditionViolated(_))
    ));

    // The buffer lacks vertex 3.
    let mut short = osd::CpuVertexBuffer::new(1, 3)?;
    let batches = KernelBatch::from_stencil_table(&table);
    assert!(matches!(
        controller.compute(&context, &batches, Some(&mut short), None),
        Err(Error::InvalidBufferSize { .. })
    ));

    // Without buffers nothing happens.
    controller.compute(&context, &batches, None::<&mut osd::CpuVertexBuffer>, None)?;
    Ok(())
}

#[test]
fn test_uniform_mesh() -> Result<()> {
    init_logger();

    let controller = osd::CpuComputeController::new();
    let mut mesh = CpuMesh::new(
        &controller,
        cube_refiner()?,
        3,
        0,
        1,
        osd::MeshOptions::default(),
    )?;

    // Control vertices plus the finest level.
    assert_eq!(mesh.vertices_len(), 8 + 26);
    assert!(mesh.vertex_buffer().is_some());
    assert!(mesh.varying_buffer().is_none());
    assert!(mesh.bind_varying_buffer().is_none());
    assert!(!mesh.options().adaptive);
    assert_eq!(mesh.kernel_batches().len(), 1);

    mesh.update_vertex_buffer(&CUBE_POSITIONS, 0, 8)?;
    mesh.refine()?;
    mesh.synchronize();

    let binding = mesh.bind_vertex_buffer().expect("vertex buffer");
    assert_close(binding.vertex(8).expect("face point"), &[0.0, 0.0, 0.5]);
    assert_close(
        binding.vertex(8 + 18).expect("vertex point"),
        &CUBE_POSITIONS[0..3],
    );

    let draw_context = mesh.draw_context().expect("draw context");
    assert_eq!(draw_context.vertex_elements_len(), 3);
    assert!(!draw_context.is_face_varying());
    assert_eq!(draw_context.patch_arrays().len(), 1);
    let array = draw_context.patch_arrays()[0];
    assert_eq!(array.descriptor.patch_type(), far::PatchType::Quads);
    assert_eq!(array.patches_len, 24);
    assert_eq!(array.index_base, 0);
    assert_eq!(array.primitive_id_base, 0);
    assert_eq!(draw_context.index_buffer().len(), 96);
    assert!(draw_context
        .index_buffer()
        .iter()
        .all(|&index| (8..34).contains(&index)));
    assert_eq!(draw_context.patch_params().len(), 24);
    assert_eq!(draw_context.patch_params_bytes().len(), 24 * 12);

    // No varying buffer to update.
    assert!(matches!(
        mesh.update_varying_buffer(&CUBE_POSITIONS, 0, 8),
        Err(Error::PreconditionViolated(_))
    ));
    Ok(())
}

#[test]
fn test_uniform_mesh_level_2_without_varying_data() -> Result<()> {
    let controller = osd::CpuComputeController::new();
    let refiner = cube_refiner()?;
    let mesh = CpuMesh::new(&controller, refiner, 3, 0, 2, osd::MeshOptions::default())?;

    let finest = mesh.refiner().vertex_count(2);
    assert_eq!(finest, 98);
    assert_eq!(mesh.vertices_len(), 8 + finest);
    assert_eq!(
        mesh.vertex_buffer().map(osd::CpuVertexBuffer::vertices_len),
        Some(8 + finest)
    );
    assert!(mesh.varying_buffer().is_none());
    Ok(())
}

#[test]
fn test_uniform_mesh_level_0() -> Result<()> {
    let controller = osd::CpuComputeController::new();
    let mut mesh = CpuMesh::new(
        &controller,
        cube_refiner()?,
        3,
        3,
        0,
        osd::MeshOptions::default(),
    )?;

    // The base level doubles as the finest level.
    assert_eq!(mesh.refiner().max_level(), 0);
    assert_eq!(mesh.vertices_len(), 8 + 8);
    assert_eq!(
        mesh.vertex_buffer().map(osd::CpuVertexBuffer::vertices_len),
        Some(16)
    );
    assert_eq!(
        mesh.kernel_batches(),
        &[KernelBatch {
            level: 1,
            start: 0,
            end: 8
        }]
    );

    mesh.update_vertex_buffer(&CUBE_POSITIONS, 0, 8)?;
    mesh.update_varying_buffer(&CUBE_POSITIONS, 0, 8)?;
    mesh.refine()?;
    mesh.synchronize();

    for binding in [
        mesh.bind_vertex_buffer().expect("vertex buffer"),
        mesh.bind_varying_buffer().expect("varying buffer"),
    ] {
        assert_eq!(&binding.as_slice()[..24], &CUBE_POSITIONS);
        assert_eq!(&binding.as_slice()[24..], &CUBE_POSITIONS);
    }

    // The control faces are the patches.
    let draw_context = mesh.draw_context().expect("draw context");
    assert_eq!(draw_context.patch_params().len(), 6);
    assert!(draw_context.patch_params().iter().all(|param| param.depth() == 0));
    assert!(draw_context.index_buffer().iter().all(|&index| index < 16));
    Ok(())
}

#[test]
fn test_adaptive_mesh_level_0() -> Result<()> {
    let controller = osd::CpuComputeController::new();
    let mut mesh = CpuMesh::new(
        &controller,
        cube_refiner()?,
        3,
        0,
        0,
        osd::MeshOptions {
            adaptive: true,
            ..Default::default()
        },
    )?;

    // Adaptive meshes count every retained level once.
    assert_eq!(mesh.refiner().max_level(), 0);
    assert_eq!(mesh.vertices_len(), 8);
    assert!(mesh.kernel_batches().is_empty());

    mesh.update_vertex_buffer(&CUBE_POSITIONS, 0, 8)?;
    mesh.refine()?;
    let binding = mesh.bind_vertex_buffer().expect("vertex buffer");
    assert_eq!(binding.as_slice(), &CUBE_POSITIONS);

    assert_eq!(
        mesh.draw_context()
            .map(|context| context.patch_params().len()),
        Some(6)
    );
    Ok(())
}

#[test]
fn test_mesh_survives_failed_updates() -> Result<()> {
    let controller = osd::CpuComputeController::new();
    let mut mesh = CpuMesh::new(
        &controller,
        cube_refiner()?,
        3,
        0,
        1,
        osd::MeshOptions::default(),
    )?;
    let vertices_len = mesh.vertices_len();

    assert!(matches!(
        mesh.update_vertex_buffer(&CUBE_POSITIONS, usize::MAX, 8),
        Err(Error::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        mesh.update_vertex_buffer(&CUBE_POSITIONS, vertices_len - 2, 3),
        Err(Error::IndexOutOfRange { .. })
    ));
    assert!(mesh
        .vertex_buffer()
        .expect("vertex buffer")
        .bind_cpu_buffer()
        .iter()
        .all(|&v| v == 0.0));

    // A descriptor pointing far past the buffer.
    assert!(matches!(
        mesh.refine_with_descriptors(
            Some(osd::BufferDescriptor::new(usize::MAX - 3, 3, 3)?),
            None
        ),
        Err(Error::InvalidBufferSize { .. })
    ));

    // Still usable.
    mesh.update_vertex_buffer(&CUBE_POSITIONS, 0, 8)?;
    mesh.refine()?;
    let binding = mesh.bind_vertex_buffer().expect("vertex buffer");
    assert_close(binding.vertex(8).expect("face point"), &[0.0, 0.0, 0.5]);
    Ok(())
}

#[test]
fn test_adaptive_mesh() -> Result<()> {
    init_logger();

    let controller = osd::CpuComputeController::new();
    let mut mesh = CpuMesh::new(
        &controller,
        cube_refiner()?,
        3,
        3,
        2,
        osd::MeshOptions {
            adaptive: true,
            ..Default::default()
        },
    )?;

    // Vertices of all levels.
    assert_eq!(mesh.vertices_len(), 8 + 26 + 98);
    assert!(mesh.options().adaptive);
    assert_eq!(mesh.kernel_batches().len(), 2);

    mesh.update_vertex_buffer(&CUBE_POSITIONS, 0, 8)?;
    mesh.update_varying_buffer(&CUBE_POSITIONS, 0, 8)?;
    mesh.refine()?;

    // The vertex point of corner 0 in level 2 still sits on the corner.
    let refiner = mesh.refiner();
    let level_1 = refiner
        .refinement(0)
        .and_then(|refinement| refinement.vertex_child_vertex(Index(0)))
        .expect("level 1 corner");
    let level_2 = refiner
        .refinement(1)
        .and_then(|refinement| refinement.vertex_child_vertex(level_1))
        .expect("level 2 corner");

    let vertex = mesh.bind_vertex_buffer().expect("vertex buffer");
    let varying = mesh.bind_varying_buffer().expect("varying buffer");
    for binding in [vertex, varying] {
        assert_close(
            binding.vertex(8 + level_1.get()).expect("level 1"),
            &CUBE_POSITIONS[0..3],
        );
        assert_close(
            binding.vertex(8 + 26 + level_2.get()).expect("level 2"),
            &CUBE_POSITIONS[0..3],
        );
    }

    // Every face refined twice, so all patches live in level 2.
    let draw_context = mesh.draw_context().expect("draw context");
    assert_eq!(draw_context.patch_params().len(), 96);
    assert!(draw_context
        .patch_params()
        .iter()
        .all(|param| param.depth() == 2));
    assert!(draw_context
        .index_buffer()
        .iter()
        .all(|&index| (34..132).contains(&index)));
    Ok(())
}

#[test]
fn test_mesh_interleaved_refinement() -> Result<()> {
    let controller = osd::CpuComputeController::new();
    let mut mesh = CpuMesh::new(
        &controller,
        cube_refiner()?,
        6,
        0,
        1,
        osd::MeshOptions::default(),
    )?;

    // Positions followed by a constant attribute.
    let control: Vec<f32> = CUBE_POSITIONS
        .chunks(3)
        .flat_map(|p| [p[0], p[1], p[2], 1.0, 1.0, 1.0])
        .collect();
    mesh.update_vertex_buffer(&control, 0, 8)?;

    mesh.refine_with_descriptors(Some(osd::BufferDescriptor::new(0, 3, 6)?), None)?;

    let binding = mesh.bind_vertex_buffer().expect("vertex buffer");
    let face_point = binding.vertex(8).expect("face point");
    assert_close(&face_point[0..3], &[0.0, 0.0, 0.5]);
    assert_eq!(&face_point[3..6], &[0.0; 3]);

    // Now the attribute, too.
    mesh.refine_with_descriptors(Some(osd::BufferDescriptor::new(3, 3, 6)?), None)?;
    let binding = mesh.bind_vertex_buffer().expect("vertex buffer");
    assert_close(binding.vertex(8).expect("face point"), &[0.0, 0.0, 0.5, 1.0, 1.0, 1.0]);
    Ok(())
}

#[test]
fn test_mesh_without_buffers() -> Result<()> {
    let controller = osd::CpuComputeController::new();
    let mut mesh = CpuMesh::new(
        &controller,
        cube_refiner()?,
        0,
        0,
        2,
        osd::MeshOptions::default(),
    )?;

    assert!(mesh.vertex_buffer().is_none());
    assert!(mesh.bind_vertex_buffer().is_none());
    assert!(mesh.compute_context().is_some());
    // Nothing to compute.
    mesh.refine()?;
    assert!(matches!(
        mesh.update_vertex_buffer(&CUBE_POSITIONS, 0, 8),
        Err(Error::PreconditionViolated(_))
    ));
    Ok(())
}

#[test]
fn test_mesh_with_empty_control_mesh() -> Result<()> {
    let controller = osd::CpuComputeController::new();
    let refiner = far::TopologyRefiner::new(
        far::TopologyDescriptor::new(0, &[], &[])?,
        far::TopologyRefinerOptions::default(),
    )?;

    assert!(matches!(
        CpuMesh::new(&controller, refiner, 3, 0, 2, osd::MeshOptions::default()),
        Err(Error::InvalidTopology(_))
    ));
    Ok(())
}

#[test]
fn test_mesh_from_parts() -> Result<()> {
    let controller = osd::CpuComputeController::new();
    let mut mesh = CpuMesh::from_parts(
        &controller,
        osd::MeshParts {
            refiner: cube_refiner()?,
            vertex_buffer: Some(osd::CpuVertexBuffer::new(3, 8)?),
            varying_buffer: None,
            compute_context: None,
            draw_context: None,
            kernel_batches: Vec::new(),
        },
    );

    // An unrefined uniform topology counts its base level twice.
    assert_eq!(mesh.vertices_len(), 16);
    assert!(!mesh.options().adaptive);
    assert!(mesh.draw_context().is_none());
    mesh.update_vertex_buffer(&CUBE_POSITIONS, 0, 8)?;

    assert!(matches!(mesh.refine(), Err(Error::PreconditionViolated(_))));
    assert!(matches!(
        mesh.refine_with_descriptors(None, None),
        Err(Error::PreconditionViolated(_))
    ));
    Ok(())
}

#[test]
fn test_mesh_interface() -> Result<()> {
    let controller = osd::CpuComputeController::new();
    let mut meshes: Vec<Box<dyn MeshInterface<DrawContext = osd::CpuDrawContext> + '_>> = vec![
        Box::new(CpuMesh::new(
            &controller,
            cube_refiner()?,
            3,
            0,
            1,
            osd::MeshOptions::default(),
        )?),
        Box::new(CpuMesh::new(
            &controller,
            cube_refiner()?,
            3,
            0,
            1,
            osd::MeshOptions {
                adaptive: true,
                ..Default::default()
            },
        )?),
    ];

    for mesh in &mut meshes {
        mesh.update_vertex_buffer(&CUBE_POSITIONS, 0, 8)?;
        mesh.refine()?;
        mesh.synchronize();
        assert_eq!(mesh.vertices_len(), 8 + 26);
        assert_eq!(
            mesh.draw_context()
                .map(|context| context.patch_params().len()),
            Some(24)
        );
    }
    Ok(())
}
