use std::path::{Path, PathBuf};

use node_forge_shadergen::{
    dsl::{MaterialDocument, NodeDesc},
    generator::{
        GenContext, GenError, GenOptions, HlslResourceBinding, HlslShaderGenerator, Shader,
        StageKind,
    },
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LightCase {
    type_id: u32,
    light: NodeDesc,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Expectations {
    vertex: Vec<String>,
    pixel: Vec<String>,
    pixel_absent: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Case {
    #[serde(default)]
    options: GenOptions,
    #[serde(default)]
    explicit_bindings: bool,
    #[serde(default)]
    lights: Vec<LightCase>,
    document: MaterialDocument,
    #[serde(default)]
    expect: Expectations,
}

fn case_dir(case_name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("cases")
        .join(case_name)
}

fn list_json_cases(dir: &Path) -> Vec<PathBuf> {
    let mut cases = Vec::new();
    let Ok(rd) = std::fs::read_dir(dir) else {
        return cases;
    };
    for entry in rd.flatten() {
        let path = entry.path();
        if path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            && !path.to_string_lossy().ends_with(".bindings.json")
            && std::fs::metadata(&path).is_ok_and(|m| m.is_file())
        {
            cases.push(path);
        }
    }
    cases.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    cases
}

fn case_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("case")
        .to_string()
}

fn generate_case(case_name: &str, case: &Case) -> Shader {
    let generator = HlslShaderGenerator::new();
    let desc = &case.document.graphs[0];
    let graph = generator
        .build_graph(desc)
        .unwrap_or_else(|e| panic!("case {case_name}: build graph failed: {e}"));

    let mut ctx = GenContext::new(case.options.clone());
    if case.explicit_bindings {
        ctx = ctx.with_binding_strategy(HlslResourceBinding::default());
    }
    for light in &case.lights {
        generator
            .bind_light_shader(&mut ctx, light.type_id, &light.light)
            .unwrap_or_else(|e| panic!("case {case_name}: bind light failed: {e}"));
    }
    generator
        .generate(&desc.name, &graph, &mut ctx)
        .unwrap_or_else(|e| panic!("case {case_name}: generate failed: {e}"))
}

fn check_golden(path: &Path, actual: &str, update_goldens: bool) {
    if update_goldens {
        std::fs::write(path, actual).unwrap_or_else(|e| panic!("write {path:?}: {e}"));
        return;
    }
    // Goldens are optional; cases without committed goldens only run their expectations.
    let Ok(expected) = std::fs::read_to_string(path) else {
        return;
    };
    pretty_assertions::assert_eq!(expected, actual, "golden mismatch for {}", path.display());
}

#[test]
fn json_cases_generate_expected_hlsl() {
    let dir = case_dir("hlsl_generation");
    let update_goldens = std::env::var("UPDATE_GOLDENS").is_ok_and(|v| v != "0");

    let json_cases = list_json_cases(&dir);
    assert!(
        !json_cases.is_empty(),
        "expected at least one *.json case in {}",
        dir.display()
    );

    for input_path in json_cases {
        let case_name = case_stem(&input_path);
        let text = std::fs::read_to_string(&input_path)
            .unwrap_or_else(|e| panic!("case {case_name}: read failed: {e}"));
        let case: Case = serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("case {case_name}: invalid case json: {e}"));

        let shader = generate_case(&case_name, &case);
        let vertex = shader.source(StageKind::Vertex);
        let pixel = shader.source(StageKind::Pixel);

        assert!(
            vertex.contains("VSOutput VS_Main(VSInput input)"),
            "case {case_name}: vertex stage should define VS_Main"
        );
        assert!(
            pixel.contains("PSOutput PS_Main(VSOutput input)"),
            "case {case_name}: pixel stage should define PS_Main"
        );
        assert!(
            !vertex.contains('$') && !pixel.contains('$'),
            "case {case_name}: unreplaced token"
        );
        for needle in &case.expect.vertex {
            assert!(
                vertex.contains(needle.as_str()),
                "case {case_name}: vertex stage is missing {needle:?}\n{vertex}"
            );
        }
        for needle in &case.expect.pixel {
            assert!(
                pixel.contains(needle.as_str()),
                "case {case_name}: pixel stage is missing {needle:?}\n{pixel}"
            );
        }
        for needle in &case.expect.pixel_absent {
            assert!(
                !pixel.contains(needle.as_str()),
                "case {case_name}: pixel stage should not contain {needle:?}"
            );
        }

        let bindings = shader
            .binding_table_json()
            .unwrap_or_else(|e| panic!("case {case_name}: binding table json failed: {e}"));
        if case.explicit_bindings {
            assert!(
                shader.binding_table().iter().all(|b| b.slot.is_some()),
                "case {case_name}: explicit bindings must all carry a slot"
            );
        }

        check_golden(&dir.join(format!("{case_name}.vs.hlsl")), &vertex, update_goldens);
        check_golden(&dir.join(format!("{case_name}.ps.hlsl")), &pixel, update_goldens);
        check_golden(
            &dir.join(format!("{case_name}.bindings.json")),
            &bindings,
            update_goldens,
        );
    }
}

fn document(json: &str) -> MaterialDocument {
    serde_json::from_str(json).expect("valid document json")
}

fn generate(json: &str, options: GenOptions) -> Result<Shader, GenError> {
    let doc = document(json);
    let generator = HlslShaderGenerator::new();
    let graph = generator.build_graph(&doc.graphs[0])?;
    generator.generate(&doc.graphs[0].name, &graph, &mut GenContext::new(options))
}

#[test]
fn cyclic_graph_is_malformed() {
    let err = generate(
        r#"{ "version": "1.0", "graphs": [{
            "name": "Loop",
            "nodes": [
                { "name": "a", "category": "add", "type": "float" },
                { "name": "b", "category": "add", "type": "float" }
            ],
            "connections": [
                { "from": { "node": "a" }, "to": { "node": "b", "port": "in1" } },
                { "from": { "node": "b" }, "to": { "node": "a", "port": "in1" } }
            ],
            "outputs": [{ "name": "out", "type": "float", "node": "b" }]
        }]}"#,
        GenOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::MalformedGraph(_)));
}

#[test]
fn unknown_category_is_malformed() {
    let err = generate(
        r#"{ "version": "1.0", "graphs": [{
            "name": "M",
            "nodes": [{ "name": "n", "category": "noise3d", "type": "float" }],
            "outputs": [{ "name": "out", "type": "float", "node": "n" }]
        }]}"#,
        GenOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::MalformedGraph(_)));
}

#[test]
fn unsized_array_uniform_reports_missing_length() {
    let err = generate(
        r#"{ "version": "1.0", "graphs": [{
            "name": "M",
            "nodes": [{ "name": "n", "category": "constant", "type": "float",
                        "inputs": [{ "name": "weights", "type": "floatarray", "value": [], "uniform": true }] }],
            "outputs": [{ "name": "out", "type": "float", "node": "n" }]
        }]}"#,
        GenOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::MissingArrayLength { .. }));
}

#[test]
fn out_of_range_option_is_rejected_before_emission() {
    let options = GenOptions {
        hw_transmission_render_method: 5,
        ..GenOptions::default()
    };
    let err = generate(
        r#"{ "version": "1.0", "graphs": [{
            "name": "M", "nodes": [],
            "outputs": [{ "name": "out", "type": "float", "value": 1.0 }]
        }]}"#,
        options,
    )
    .unwrap_err();
    assert!(matches!(err, GenError::InvalidOption(_)));
}

#[test]
fn document_loader_reports_path() {
    let err = node_forge_shadergen::dsl::load_document_from_path("does/not/exist.json").unwrap_err();
    assert!(format!("{err:#}").contains("does/not/exist.json"));
}
