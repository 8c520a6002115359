use std::collections::HashSet;
use std::path::Path;

fn main() {
    let taxonomy_path = Path::new("taxonomies/demo_taxonomy.json");
    validate_taxonomy_file(taxonomy_path);
    set_build_dependencies();
}

fn validate_taxonomy_file(taxonomy_path: &Path) {
    // Ensure the embedded taxonomy exists at build time
    assert!(
        taxonomy_path.exists(),
        "\n\nTAXONOMY BUILD ERROR: File not found\n\
         Path: {}\n\
         Please create the taxonomy file before building.\n",
        taxonomy_path.display()
    );

    let contents = std::fs::read_to_string(taxonomy_path).unwrap_or_else(|e| {
        panic!(
            "\n\nTAXONOMY BUILD ERROR: Failed to read file\n\
             Path: {}\n\
             Error: {e}\n",
            taxonomy_path.display()
        );
    });

    let taxonomy: serde_json::Value = serde_json::from_str(&contents).unwrap_or_else(|e| {
        panic!(
            "\n\nTAXONOMY BUILD ERROR: Invalid JSON\n\
             Path: {}\n\
             Error: {e}\n\
             Hint: Check for missing commas, brackets, or invalid syntax.\n",
            taxonomy_path.display()
        );
    });

    validate_taxonomy_structure(&taxonomy);
}

fn validate_taxonomy_structure(taxonomy: &serde_json::Value) {
    assert!(
        taxonomy.is_object(),
        "\n\nTAXONOMY BUILD ERROR: Root must be a JSON object\n\
         Got: {taxonomy}\n"
    );

    assert!(
        taxonomy.get("version").and_then(|v| v.as_str()).is_some(),
        "\n\nTAXONOMY BUILD ERROR: Missing 'version' field\n"
    );

    let taxa = taxonomy.get("taxa").unwrap_or_else(|| {
        panic!(
            "\n\nTAXONOMY BUILD ERROR: Missing 'taxa' field\n\
             The taxonomy must have a top-level 'taxa' array.\n"
        );
    });

    let taxa = taxa.as_array().unwrap_or_else(|| {
        panic!(
            "\n\nTAXONOMY BUILD ERROR: 'taxa' must be an array\n\
             Got: {taxa}\n"
        );
    });

    let ids = validate_taxa(taxa);
    validate_parents(taxa, &ids);

    println!(
        "cargo:warning=Validated taxonomy: {} taxa",
        taxa.len()
    );
}

/// Check required fields and id uniqueness, returning the set of ids
fn validate_taxa(taxa: &[serde_json::Value]) -> HashSet<u64> {
    let mut ids = HashSet::with_capacity(taxa.len());
    let mut roots = 0;

    for (i, taxon) in taxa.iter().enumerate() {
        let id = taxon
            .get("id")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or_else(|| {
                panic!("\n\nTAXONOMY BUILD ERROR: Taxon at index {i} missing numeric 'id' field\n")
            });

        let name = taxon.get("name").and_then(|v| v.as_str()).unwrap_or("");
        assert!(
            !name.trim().is_empty(),
            "\n\nTAXONOMY BUILD ERROR: Taxon {id} (index {i}) missing 'name' field\n"
        );

        assert!(
            ids.insert(id),
            "\n\nTAXONOMY BUILD ERROR: Duplicate taxon id {id} ('{name}')\n"
        );

        if taxon.get("parent").map_or(true, serde_json::Value::is_null) {
            roots += 1;
        }
    }

    assert!(
        roots == 1,
        "\n\nTAXONOMY BUILD ERROR: Expected exactly one root taxon, found {roots}\n\
         Every taxon except the root must have a 'parent'.\n"
    );

    ids
}

fn validate_parents(taxa: &[serde_json::Value], ids: &HashSet<u64>) {
    for taxon in taxa {
        if let Some(parent) = taxon.get("parent").and_then(serde_json::Value::as_u64) {
            let name = taxon.get("name").and_then(|v| v.as_str()).unwrap_or("<unknown>");
            assert!(
                ids.contains(&parent),
                "\n\nTAXONOMY BUILD ERROR: Taxon '{name}' refers to missing parent {parent}\n"
            );
        }
    }
}

fn set_build_dependencies() {
    // Tell cargo to rerun if the embedded taxonomy changes
    println!("cargo:rerun-if-changed=taxonomies/demo_taxonomy.json");

    // Tell cargo to rerun if build.rs changes
    println!("cargo:rerun-if-changed=build.rs");
}
