use graver_core::graphics::device::{CacheDevice, DeviceCall};
use graver_core::{Error, Interpreter, NullDevice, PsError};

fn run(source: &str) -> Interpreter {
    let mut interp = Interpreter::new(Box::new(NullDevice)).expect("interpreter setup");
    interp.run_source(source.as_bytes()).expect("program runs");
    interp
}

fn run_err(source: &str) -> PsError {
    let mut interp = Interpreter::new(Box::new(NullDevice)).expect("interpreter setup");
    match interp.run_source(source.as_bytes()) {
        Err(Error::Ps(e)) => e,
        other => panic!("expected language error, got {other:?}"),
    }
}

fn run_with_device(source: &str) -> Vec<DeviceCall> {
    let device = CacheDevice::new();
    let data = device.data();
    let mut interp = Interpreter::new(Box::new(device)).expect("interpreter setup");
    interp.run_source(source.as_bytes()).expect("program runs");
    let calls = data.borrow().calls.clone();
    calls
}

fn pop4(interp: &mut Interpreter) -> (f64, f64, f64, f64) {
    let d = interp.op_stack.pop_real().unwrap();
    let c = interp.op_stack.pop_real().unwrap();
    let b = interp.op_stack.pop_real().unwrap();
    let a = interp.op_stack.pop_real().unwrap();
    (a, b, c, d)
}

#[test]
fn pathbbox_of_a_square() {
    let mut i = run("0 0 moveto 10 0 lineto 10 10 lineto closepath pathbbox");
    assert_eq!(pop4(&mut i), (0.0, 0.0, 10.0, 10.0));
}

#[test]
fn pathbbox_on_empty_path_is_nocurrentpoint() {
    assert_eq!(run_err("pathbbox"), PsError::NoCurrentPoint);
}

#[test]
fn currentpoint_tracks_construction() {
    let mut i = run("1 2 moveto 3 4 lineto currentpoint");
    assert_eq!(i.op_stack.pop_real().unwrap(), 4.0);
    assert_eq!(i.op_stack.pop_real().unwrap(), 3.0);
}

#[test]
fn currentpoint_without_path_is_nocurrentpoint() {
    assert_eq!(run_err("currentpoint"), PsError::NoCurrentPoint);
    assert_eq!(run_err("1 2 rmoveto"), PsError::NoCurrentPoint);
    assert_eq!(run_err("newpath currentpoint"), PsError::NoCurrentPoint);
}

#[test]
fn closepath_returns_to_subpath_start() {
    let mut i = run("5 6 moveto 20 6 lineto 20 30 lineto closepath currentpoint");
    assert_eq!(i.op_stack.pop_real().unwrap(), 6.0);
    assert_eq!(i.op_stack.pop_real().unwrap(), 5.0);
}

#[test]
fn relative_operators_accumulate() {
    let mut i = run("10 10 moveto 5 0 rlineto 0 5 rlineto currentpoint");
    assert_eq!(i.op_stack.pop_real().unwrap(), 15.0);
    assert_eq!(i.op_stack.pop_real().unwrap(), 15.0);
}

#[test]
fn translate_moves_device_coordinates() {
    let calls = run_with_device("10 20 translate 0 0 moveto 5 5 lineto stroke");
    assert!(calls.contains(&DeviceCall::Moveto(10.0, 20.0)));
    assert!(calls.contains(&DeviceCall::Lineto(15.0, 25.0)));
    assert!(calls.contains(&DeviceCall::Stroke));
}

#[test]
fn scale_is_applied_before_sections_are_stored() {
    let mut i = run("2 3 scale 1 1 moveto pathbbox");
    // pathbbox reports user space, so the round trip is identity...
    let (llx, lly, urx, ury) = pop4(&mut i);
    assert!((llx - 1.0).abs() < 1e-9);
    assert!((lly - 1.0).abs() < 1e-9);
    assert!((urx - 1.0).abs() < 1e-9);
    assert!((ury - 1.0).abs() < 1e-9);

    // ...while the device sees scaled coordinates.
    let calls = run_with_device("2 3 scale 1 1 moveto 1 1 lineto stroke");
    assert!(calls.contains(&DeviceCall::Moveto(2.0, 3.0)));
}

#[test]
fn stroke_flattens_curves_into_polylines() {
    let calls = run_with_device("0 0 moveto 25 90 75 -60 100 10 curveto stroke");
    // Only moveto/lineto reach the device, never a curveto.
    assert!(calls
        .iter()
        .all(|c| !matches!(c, DeviceCall::Curveto(..))));
    let linetos = calls
        .iter()
        .filter(|c| matches!(c, DeviceCall::Lineto(..)))
        .count();
    assert!(linetos >= 3, "a bent curve needs several segments");
    // The last lineto lands on the curve's true endpoint.
    let last = calls
        .iter()
        .rev()
        .find_map(|c| match c {
            DeviceCall::Lineto(x, y) => Some((*x, *y)),
            _ => None,
        })
        .unwrap();
    assert_eq!(last, (100.0, 10.0));
}

#[test]
fn stroke_starts_a_new_path() {
    assert_eq!(
        run_err("0 0 moveto 1 1 lineto stroke currentpoint"),
        PsError::NoCurrentPoint
    );
}

#[test]
fn fill_and_eofill_report_the_rule() {
    let calls = run_with_device("0 0 moveto 10 0 lineto 10 10 lineto closepath fill");
    assert!(calls.contains(&DeviceCall::Fill { even_odd: false }));
    let calls = run_with_device("0 0 moveto 10 0 lineto 10 10 lineto closepath eofill");
    assert!(calls.contains(&DeviceCall::Fill { even_odd: true }));
}

#[test]
fn flattenpath_replaces_curves_in_place() {
    let mut i = run("0 0 moveto 25 90 75 -60 100 10 curveto flattenpath pathbbox");
    let (llx, lly, urx, ury) = pop4(&mut i);
    // The flattened extent stays inside the control polygon...
    assert!(llx >= -1.0 && lly >= -60.0 && urx <= 101.0 && ury <= 90.0);
    // ...and covers the full parameter range.
    assert!(urx >= 99.0);
}

#[test]
fn line_styling_round_trips() {
    let mut i = run("2.5 setlinewidth currentlinewidth");
    assert_eq!(i.op_stack.pop_real().unwrap(), 2.5);

    let mut i = run("[4 2] 1 setdash currentdash");
    assert_eq!(i.op_stack.pop_real().unwrap(), 1.0);
    let pattern = i.op_stack.pop_array().unwrap();
    assert_eq!(pattern.len, 2);

    let mut i = run("5 setflat currentflat");
    assert_eq!(i.op_stack.pop_real().unwrap(), 5.0);

    // Flatness clamps to its defined range.
    let mut i = run("0.01 setflat currentflat 1000 setflat currentflat");
    assert_eq!(i.op_stack.pop_real().unwrap(), 100.0);
    assert_eq!(i.op_stack.pop_real().unwrap(), 0.2);
}

#[test]
fn setdash_rejects_negative_entries() {
    assert_eq!(run_err("[-1] 0 setdash"), PsError::RangeCheck);
}
