use phaseline_core::equation_engine::Equation;
use phaseline_core::{
    dedup_within, find_fixed_points, is_stable, iterate, phase_diagram, DiscreteMap, Euler,
    FixedPointSettings, Flow, PhaseDiagramConfig, SolverConfig, Stability, StabilitySettings,
};

#[test]
fn logistic_map_from_orbit_to_phase_line() {
    let map = DiscreteMap::new(|x: f64| 2.5 * x * (1.0 - x));

    let orbit = iterate(&map, 0.0001, 40);
    assert!((orbit[39] - 0.6).abs() < 1e-6);

    let seeds = [-1.0, -0.1, 0.01, 0.5, 1.0];
    let values: Vec<f64> = find_fixed_points(&map, &seeds, FixedPointSettings::default())
        .expect("fixed point search should accept default settings")
        .into_iter()
        .map(|result| result.value)
        .collect();
    let fixed = dedup_within(&values, 1e-6);
    assert_eq!(fixed.len(), 2);

    let flags: Vec<Stability> = fixed
        .iter()
        .map(|&x| is_stable(&map, x, 0.1, StabilitySettings::default()))
        .collect::<anyhow::Result<_>>()
        .expect("stability should classify");
    assert_eq!(
        flags,
        vec![
            Stability {
                left_stable: false,
                right_stable: false
            },
            Stability {
                left_stable: true,
                right_stable: true
            },
        ]
    );

    let diagram = phase_diagram(&fixed, &flags, PhaseDiagramConfig::default())
        .expect("diagram should render");
    assert_eq!(
        diagram.to_string(),
        "------<-----*---------->------------>----------*-----<------\n            0                                  0.6"
    );
}

#[test]
fn equation_driven_flow_matches_closure_flow() {
    let params = vec![0.2, 20.0];
    let names = vec!["k".to_string(), "T".to_string()];
    let deriv = Equation::compile("k * (T - x)", "x", &names, params).expect("equation compiles");
    let config = SolverConfig { deltat: 2.0 };

    let from_equation = iterate(&Flow::new(deriv, Euler, config), 15.0, 25);
    let from_closure = iterate(&Flow::new(|x: f64| 0.2 * (20.0 - x), Euler, config), 15.0, 25);
    assert_eq!(from_equation, from_closure);

    let deriv = Equation::compile("k * (T - x)", "x", &names, vec![0.2, 20.0]).expect("equation compiles");
    let flow = Flow::new(deriv, Euler, config);
    let flags = is_stable(&flow, 20.0, 0.1, StabilitySettings::default()).expect("classify");
    assert!(flags.is_stable());
}
