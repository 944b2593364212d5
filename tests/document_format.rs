use craftevo::document::ConfigTree;
use craftevo::error::EvolutionError;
use tempfile::TempDir;

const CRAFT: &str = r#"
ship = Falcon
version = 1.12.5
// top level comment
PART
{
	part = cockpit_4294
	pos = 0,15,0
	MODULE
	{
		name = BDModulePilotAI
		steerMult = 2.0   // trailing comment
	}
	MODULE {
		name = BDModulePilotAIExtended
		steerMult = 6
	}
}
PART
{
	part = wing_4301
	MODULE
	{
		name = ModuleControlSurface
		authorityLimiter = 100
	}
}
"#;

#[test]
fn test_parse_structure() {
    let tree = ConfigTree::parse(CRAFT).unwrap();
    let root = tree.root();

    assert_eq!(tree.get_value(root, "ship"), Some("Falcon"));
    assert_eq!(tree.get_value(root, "version"), Some("1.12.5"));
    assert_eq!(tree.children_of_kind(root, "PART").count(), 2);

    let modules = tree.find_nodes(root, "MODULE", "name", "BDModulePilotAI");
    assert_eq!(modules.len(), 2);
    assert_eq!(tree.get_value(modules[0], "steerMult"), Some("2.0"));
    assert_eq!(tree.get_f64(modules[1], "steerMult"), Some(6.0));

    let part = tree.enclosing(modules[1], "PART").unwrap();
    assert_eq!(tree.get_value(part, "part"), Some("cockpit_4294"));
    assert_eq!(tree.get_value(part, "pos"), Some("0,15,0"));
}

#[test]
fn test_written_text_parses_back_to_equal_tree() {
    let tree = ConfigTree::parse(CRAFT).unwrap();
    let reparsed = ConfigTree::parse(&tree.to_text()).unwrap();
    assert_eq!(reparsed, tree);
}

#[test]
fn test_clone_is_independent() {
    let seed = ConfigTree::parse(CRAFT).unwrap();
    let mut copy = seed.clone();
    let module = copy
        .find_first(copy.root(), "MODULE", "name", "ModuleControlSurface")
        .unwrap();

    assert!(copy.set_f64(module, "authorityLimiter", 110.0));
    assert!(!copy.set_value(module, "missingField", "1"));

    let original = seed
        .find_first(seed.root(), "MODULE", "name", "ModuleControlSurface")
        .unwrap();
    assert_eq!(seed.get_value(original, "authorityLimiter"), Some("100"));
    assert_eq!(copy.get_value(module, "authorityLimiter"), Some("110"));
}

#[test]
fn test_unbalanced_close_reports_line() {
    let result = ConfigTree::parse("ship = A\n}\n");
    assert!(matches!(result, Err(EvolutionError::Parse { line: 2, .. })));
}

#[test]
fn test_unclosed_node_is_an_error() {
    let result = ConfigTree::parse("PART\n{\npart = x\n");
    assert!(matches!(result, Err(EvolutionError::Parse { .. })));
}

#[test]
fn test_brace_without_name_is_an_error() {
    let result = ConfigTree::parse("ship = A\n{\n}\n");
    assert!(matches!(result, Err(EvolutionError::Parse { line: 2, .. })));
}

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Falcon.craft");
    let tree = ConfigTree::parse(CRAFT).unwrap();

    tree.save(&path).unwrap();
    assert!(!dir.path().join("Falcon.craft.tmp").exists());
    assert_eq!(ConfigTree::load(&path).unwrap(), tree);
}
