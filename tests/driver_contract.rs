use etcher::clip::REGION_STACK_SIZE;
use etcher::prelude::*;
use etcher::transform::MATRIX_STACK_SIZE;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn p(x: f64, y: f64) -> DevicePoint {
    DevicePoint::new(x, y)
}

fn drawing(d: &RecordingDriver) -> Vec<&DrawCommand> {
    d.commands()
        .iter()
        .filter(|c| !matches!(c, DrawCommand::Clip(_)))
        .collect()
}

#[test]
fn test_push_and_pop_restore_matrix() {
    init();
    let mut d = RecordingDriver::new();
    d.translate(3.0, 4.0);
    let before = d.matrix();

    d.push_matrix();
    d.rotate(30.0);
    d.scale(2.0, 0.5);
    d.pop_matrix();

    assert_eq!(d.matrix(), before);
    assert!(d.take_error().is_none());
}

#[test]
fn test_matrix_stack_overflow_leaves_state_unchanged() {
    init();
    let mut d = RecordingDriver::new();
    for _ in 0..MATRIX_STACK_SIZE {
        d.push_matrix();
    }
    assert!(d.take_error().is_none());

    d.translate(5.0, 0.0);
    let top = d.matrix();
    d.push_matrix();
    assert_eq!(
        d.take_error(),
        Some(DriverError::MatrixStackOverflow(MATRIX_STACK_SIZE))
    );
    assert_eq!(d.matrix(), top);
    assert_eq!(d.state().matrix_depth(), MATRIX_STACK_SIZE);

    // the refused push must not have saved anything
    d.pop_matrix();
    assert_eq!(d.matrix(), Matrix::IDENTITY);
}

#[test]
fn test_clip_stack_overflow_is_refused() {
    init();
    let mut d = RecordingDriver::new();
    for i in 0..REGION_STACK_SIZE - 1 {
        d.push_clip(i as i32, 0, 100, 100);
    }
    assert!(d.take_error().is_none());
    let region = d.clip_region().cloned();

    d.push_clip(50, 50, 5, 5);
    assert_eq!(
        d.take_error(),
        Some(DriverError::ClipStackOverflow(REGION_STACK_SIZE - 1))
    );
    assert_eq!(d.clip_region().cloned(), region);
}

#[test]
fn test_pop_below_base_is_harmless() {
    init();
    let mut d = RecordingDriver::new();
    d.pop_matrix();
    d.pop_clip();
    assert_eq!(d.matrix(), Matrix::IDENTITY);
    assert!(d.clip_region().is_none());
    assert!(d.last_error().is_some());
}

#[test]
fn test_identity_transform() {
    let d = RecordingDriver::new();
    for &(x, y) in &[(0.0, 0.0), (12.5, -3.0), (-100.0, 7.25)] {
        assert_eq!(d.transform_x(x, y), x);
        assert_eq!(d.transform_y(x, y), y);
        assert_eq!(d.transform_dx(x, y), x);
        assert_eq!(d.transform_dy(x, y), y);
    }
}

#[test]
fn test_translations_compose() {
    let mut d = RecordingDriver::new();
    d.translate(10.0, 20.0);
    d.translate(1.0, 2.0);
    assert_eq!(d.transform_x(0.0, 0.0), 11.0);
    assert_eq!(d.transform_y(0.0, 0.0), 22.0);
    assert_eq!(d.transform_dx(5.0, 5.0), 5.0);
}

#[test]
fn test_translate_then_scale_is_not_scale_then_translate() {
    let mut a = RecordingDriver::new();
    a.translate(10.0, 0.0);
    a.scale(2.0, 2.0);

    let mut b = RecordingDriver::new();
    b.scale(2.0, 2.0);
    b.translate(10.0, 0.0);

    assert_eq!(a.transform_x(1.0, 0.0), 12.0);
    assert_eq!(b.transform_x(1.0, 0.0), 22.0);
}

#[test]
fn test_four_quarter_turns_are_identity() {
    let mut d = RecordingDriver::new();
    for _ in 0..4 {
        d.rotate(90.0);
    }
    assert_eq!(d.matrix(), Matrix::IDENTITY);
}

#[test]
fn test_clip_box_without_clip() {
    let d = RecordingDriver::new();
    let (rect, status) = d.clip_box(3, 4, 20, 30);
    assert_eq!(rect, IRect::new(3, 4, 20, 30));
    assert_eq!(status.code(), 0);
    assert!(d.not_clipped(3, 4, 20, 30));
}

#[test]
fn test_clip_box_inside_clip() {
    let mut d = RecordingDriver::new();
    d.push_clip(10, 10, 50, 50);
    let (rect, status) = d.clip_box(0, 0, 100, 100);
    assert_eq!(rect, IRect::new(10, 10, 50, 50));
    assert_eq!(status, ClipStatus::Partial);
    assert_ne!(status.code(), 0);

    let (rect, status) = d.clip_box(20, 20, 5, 5);
    assert_eq!(rect, IRect::new(20, 20, 5, 5));
    assert_eq!(status.code(), 0);
}

#[test]
fn test_clip_box_outside_clip() {
    let mut d = RecordingDriver::new();
    d.push_clip(0, 0, 10, 10);
    let (rect, status) = d.clip_box(20, 20, 5, 5);
    assert_eq!(status.code(), 2);
    assert_eq!((rect.w, rect.h), (0, 0));
    assert!(!d.not_clipped(20, 20, 5, 5));
}

#[test]
fn test_nested_clips_intersect_and_pop_back() {
    let mut d = RecordingDriver::new();
    d.push_clip(10, 10, 50, 50);
    d.push_clip(30, 30, 100, 100);
    assert_eq!(
        d.clip_region().and_then(|r| r.bounding_box()),
        Some(IRect::new(30, 30, 30, 30))
    );

    d.push_no_clip();
    assert!(d.clip_region().is_none());

    d.pop_clip();
    d.pop_clip();
    assert_eq!(
        d.clip_region().and_then(|r| r.bounding_box()),
        Some(IRect::new(10, 10, 50, 50))
    );
    d.pop_clip();
    assert!(d.clip_region().is_none());
    assert!(d.take_error().is_none());
}

#[test]
fn test_clip_changes_bump_state_number() {
    let mut d = RecordingDriver::new();
    let start = d.clip_state_number();
    d.push_clip(0, 0, 5, 5);
    d.pop_clip();
    assert_eq!(d.clip_state_number(), start.wrapping_add(2));
}

#[test]
fn test_polygon_vertices_arrive_in_order() {
    init();
    let mut d = RecordingDriver::new();
    d.set_color(Color::BLUE);
    d.begin_polygon();
    let expected: Vec<DevicePoint> = (0..6)
        .map(|i| {
            let a = i as f64 * std::f64::consts::PI / 3.0;
            p(a.cos() * 10.0 + 50.0, a.sin() * 10.0 + 50.0)
        })
        .collect();
    for v in &expected {
        d.vertex(v.x, v.y);
    }
    d.end_polygon();

    assert_eq!(
        drawing(&d),
        vec![&DrawCommand::Polygon {
            points: expected.clone(),
            contour_ends: vec![6],
            color: Color::BLUE,
        }]
    );
    assert!(!d.state().vertices().is_accumulating());
}

#[test]
fn test_gap_partitions_complex_polygon() {
    let mut d = RecordingDriver::new();
    d.begin_complex_polygon();
    for &(x, y) in &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
        d.vertex(x, y);
    }
    d.gap();
    for &(x, y) in &[(3.0, 3.0), (6.0, 3.0), (6.0, 6.0)] {
        d.vertex(x, y);
    }
    d.end_complex_polygon();

    match drawing(&d).as_slice() {
        [DrawCommand::Polygon {
            points,
            contour_ends,
            ..
        }] => {
            assert_eq!(contour_ends, &vec![5, 9]);
            assert_eq!(points[4], points[0]);
            assert_eq!(points[8], points[5]);
        }
        other => panic!("unexpected commands {:?}", other),
    }
}

#[test]
fn test_scaled_line_reaches_device_scaled() {
    let mut d = RecordingDriver::new();
    d.push_matrix();
    d.scale(2.0, 2.0);
    d.line(0, 0, 1, 1);
    d.pop_matrix();
    d.line(0, 0, 1, 1);

    let lines: Vec<_> = drawing(&d)
        .into_iter()
        .map(|c| match c {
            DrawCommand::Polyline { points, .. } => points.clone(),
            other => panic!("unexpected command {:?}", other),
        })
        .collect();
    assert_eq!(
        lines,
        vec![vec![p(0.0, 0.0), p(2.0, 2.0)], vec![p(0.0, 0.0), p(1.0, 1.0)]]
    );
}

#[test]
fn test_closed_shapes_match_vertex_bracket() {
    let mut fast = RecordingDriver::new();
    fast.rotate(30.0);
    fast.loop4(0, 0, 10, 0, 10, 10, 0, 10);
    fast.polygon3(0, 0, 5, 0, 5, 5);

    let mut slow = RecordingDriver::new();
    slow.rotate(30.0);
    slow.begin_loop();
    for &(x, y) in &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
        slow.vertex(x, y);
    }
    slow.end_loop();
    slow.begin_polygon();
    for &(x, y) in &[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)] {
        slow.vertex(x, y);
    }
    slow.end_polygon();

    assert_eq!(fast.commands(), slow.commands());
}

#[test]
fn test_nested_begin_is_reported() {
    init();
    let mut d = RecordingDriver::new();
    d.begin_line();
    d.vertex(0.0, 0.0);
    d.begin_polygon();
    assert!(matches!(
        d.take_error(),
        Some(DriverError::NestedBegin {
            active: PrimitiveKind::Line,
            requested: PrimitiveKind::Polygon,
        })
    ));

    // the open line survives the refused begin
    d.vertex(4.0, 0.0);
    d.end_line();
    assert_eq!(
        drawing(&d),
        vec![&DrawCommand::Polyline {
            points: vec![p(0.0, 0.0), p(4.0, 0.0)],
            color: Color::BLACK,
            style: LineStyle::default(),
        }]
    );
}

#[test]
fn test_mismatched_end_is_reported() {
    init();
    let mut d = RecordingDriver::new();
    d.end_loop();
    assert_eq!(
        d.take_error(),
        Some(DriverError::EndWithoutBegin(PrimitiveKind::Loop))
    );

    d.begin_loop();
    d.vertex(1.0, 1.0);
    d.end_polygon();
    assert!(matches!(
        d.take_error(),
        Some(DriverError::MismatchedEnd { .. })
    ));
    assert!(drawing(&d).is_empty());
    assert!(d.state().vertices().is_accumulating());
}

#[test]
fn test_vertex_outside_bracket_is_reported() {
    let mut d = RecordingDriver::new();
    d.vertex(1.0, 2.0);
    assert_eq!(d.take_error(), Some(DriverError::VertexOutsidePrimitive));
    assert!(d.state().vertices().is_empty());
}

#[test]
fn test_uncached_handle_is_never_reused() {
    init();
    let mut d = RecordingDriver::new();
    let pixels = image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));

    let first = d.cache_image(&pixels).unwrap();
    assert!(d.is_cached(first));
    assert!(d.uncache_image(first));
    assert!(!d.is_cached(first));
    assert!(!d.uncache_image(first));

    let second = d.cache_image(&pixels).unwrap();
    assert_ne!(first, second);
    assert!(d.is_cached(second));
    assert!(!d.is_cached(first));

    d.draw_image(first, 0, 0, 4, 4, 0, 0);
    assert!(matches!(
        d.take_error(),
        Some(DriverError::StaleHandle { .. })
    ));
    assert!(drawing(&d).is_empty());
}

#[test]
fn test_drawing_through_current_driver() {
    init();
    let driver = shared(RecordingDriver::new());
    let drawn = with_surface(driver.clone(), || {
        with_current(|d| {
            d.set_color(Color::RED);
            d.rectf(1, 2, 3, 4);
            d.name()
        })
    });
    assert_eq!(drawn, Some("RecordingDriver"));
    assert!(current().is_none());

    let driver = driver.borrow();
    assert!(driver.state().color() == Color::RED);
}

#[test]
fn test_missing_capabilities_are_neutral() {
    let mut d = RecordingDriver::new();
    d.set_font(Font::TIMES, 12);
    assert_eq!(d.width("hello"), 0.0);
    assert_eq!(d.height(), 12);
    assert_eq!(d.descent(), 0);
    assert!(d.can_do_alpha_blending());
    assert!(!d.has_feature(DriverFeatures::NATIVE));
}
