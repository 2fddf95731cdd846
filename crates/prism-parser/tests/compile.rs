use prism_core::dto::{DtoType, Mutability, PropertyTarget};
use prism_core::identifier::Id;
use prism_core::schema::{EntitySchema, PropertyMeta, SchemaBarrier, SchemaMarker, SchemaRegistry};
use prism_parser::error::{ErrorCode, ErrorKind};
use prism_parser::{CompileConfig, DiagnosticError, compile, parse};

fn hr_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    let entities = vec![
        // Registered before its association target on purpose
        EntitySchema::new(
            Id::new("hr.Department"),
            SchemaMarker::Entity,
            vec![
                PropertyMeta::id("id", "Long"),
                PropertyMeta::scalar("name", "String"),
                PropertyMeta::association("employees", "hr.Employee", true),
                PropertyMeta::id_view("employeeIds", "List<Long>", "employees"),
            ],
        ),
        EntitySchema::new(
            Id::new("hr.Employee"),
            SchemaMarker::Entity,
            vec![
                PropertyMeta::id("id", "Long"),
                PropertyMeta::scalar("firstName", "String"),
                PropertyMeta::scalar("lastName", "String"),
                PropertyMeta::scalar("email", "String").with_nullable(true),
                PropertyMeta::association("department", "hr.Department", false),
                PropertyMeta::association("manager", "hr.Employee", false).with_nullable(true),
            ],
        ),
    ];
    for entity in entities {
        registry
            .register(entity.expect("valid entity"))
            .expect("unique entity");
    }
    registry
}

fn compile_source(source: &str, config: &CompileConfig) -> Result<Vec<DtoType>, DiagnosticError> {
    let mut registry = hr_registry();
    let file = parse(source)?;
    let schema = SchemaBarrier::new(&mut registry)
        .resolve()
        .expect("Failed to resolve schema");
    compile(&file, &schema, config)
}

fn compile_ok(source: &str) -> Vec<DtoType> {
    compile_source(source, &CompileConfig::default()).expect("Failed to compile")
}

fn first_kind(err: &DiagnosticError) -> ErrorKind {
    err.kind().expect("error has a code")
}

#[test]
fn test_department_view() {
    let types = compile_ok(
        r#"
        export hr.Department

        DepartmentView {
            id
            name
            employeeIds
        }
    "#,
    );

    assert_eq!(types.len(), 1);
    let view = &types[0];
    assert_eq!(view.name(), Id::new("DepartmentView"));
    assert_eq!(view.entity(), Id::new("hr.Department"));
    assert_eq!(view.property_names(), vec!["id", "name", "employeeIds"]);
    assert!(view.properties().iter().all(|p| !p.is_nullable()));
    assert_eq!(view.mutability(), Mutability::Unspecified);
    assert!(!view.is_mutable());
}

#[test]
fn test_process_default_mutability() {
    let config = CompileConfig {
        mutable: true,
        ..CompileConfig::default()
    };
    let types = compile_source("export hr.Department\nDepartmentView { id }", &config)
        .expect("Failed to compile");
    assert!(types[0].is_mutable());
}

#[test]
fn test_flatten_requires_single_valued_target() {
    let err = compile_source(
        "export hr.Department\nDepartmentView { flatten(employees) { id } }",
        &CompileConfig::default(),
    )
    .expect_err("flattening a to-many association must fail");
    assert_eq!(first_kind(&err), ErrorKind::Semantic);
    assert!(err.to_string().contains("`employees`"));
    assert!(err.to_string().contains("DepartmentView"));

    let types = compile_ok("export hr.Employee\nEmployeeView { id, flatten(department) { name } }");
    assert_eq!(types[0].property_names(), vec!["id", "departmentName"]);
}

#[test]
fn test_flatten_on_scalar_names_property() {
    let err = compile_source(
        "export hr.Employee\nEmployeeView { flat(email) { id } }",
        &CompileConfig::default(),
    )
    .expect_err("flattening a scalar must fail");
    assert_eq!(first_kind(&err), ErrorKind::Semantic);
    assert!(err.to_string().contains("`email`"));
}

#[test]
fn test_all_scalars_matches_explicit_selection() {
    let expanded = compile_ok("export hr.Department\nView { #allScalars }");
    let explicit = compile_ok("export hr.Department\nView { id, name }");
    assert_eq!(expanded, explicit);
}

#[test]
fn test_recursive_marker() {
    let types = compile_ok("export hr.Employee\nEmployeeTree { id, firstName, manager* }");
    let manager = types[0].property("manager").expect("manager selected");
    assert_eq!(
        manager.target(),
        &PropertyTarget::Recursive {
            type_name: Id::new("EmployeeTree")
        }
    );
    assert!(manager.is_nullable());
    assert!(!manager.is_many());

    let err = compile_source(
        "export hr.Department\nDepartmentTree { id, employees* }",
        &CompileConfig::default(),
    )
    .expect_err("employees never target a department directly");
    assert_eq!(first_kind(&err), ErrorKind::Semantic);
}

#[test]
fn test_error_kinds() {
    let cases = [
        ("export hr.Department\nView { id", ErrorKind::Parse),
        ("export hr.Department\nView { budget }", ErrorKind::UnresolvedProperty),
        ("export hr.Department\nView { id, name as id }", ErrorKind::DuplicateProperty),
        ("export hr.Department\nView { #everything }", ErrorKind::Semantic),
        ("export hr.Department\nView { id }\nView { name }", ErrorKind::Semantic),
        ("export hr.Nowhere\nView { id }", ErrorKind::UnknownEntity),
    ];
    for (source, kind) in cases {
        let err = compile_source(source, &CompileConfig::default()).expect_err(source);
        assert_eq!(first_kind(&err), kind, "{source}");
    }
}

#[test]
fn test_declaration_order_and_grouping() {
    let types = compile_ok(
        r#"
        export hr.Employee

        EmployeeView { #allScalars, #allReferences }
        input EmployeeInput { firstName, lastName, email!, id(department) }
        specification EmployeeSpec { firstName, email }
    "#,
    );

    let names: Vec<_> = types.iter().map(|t| t.name().to_string()).collect();
    assert_eq!(names, vec!["EmployeeView", "EmployeeInput", "EmployeeSpec"]);
    assert_eq!(
        types[0].property_names(),
        vec!["id", "firstName", "lastName", "email", "departmentId", "managerId"]
    );
    assert!(!types[1].property("email").unwrap().is_nullable());
    assert_eq!(types[1].property("departmentId").unwrap().type_name(), "Long");
    assert!(types[2].properties().iter().all(|p| p.is_nullable()));
}

#[test]
fn test_negative_reference_and_flattened_association() {
    let types = compile_ok(
        r#"
        export hr.Employee

        EmployeeView { #allScalars, #allReferences, -departmentId }
        EmployeeBoss { #allReferences, flat(manager) as boss { firstName } }
    "#,
    );

    assert_eq!(
        types[0].property_names(),
        vec!["id", "firstName", "lastName", "email", "managerId"]
    );
    // The flattened association is not also selected by the macro
    assert_eq!(types[1].property_names(), vec!["departmentId", "bossFirstName"]);
    assert!(types[1].property("bossFirstName").unwrap().is_nullable());
}

#[test]
fn test_user_properties_and_alias_groups() {
    let types = compile_ok(
        r#"
        export hr.Employee

        input EmployeeInput {
            @Doc("free text") note: String? = null
            #allScalars
            -email
            as(^ -> boss) { id(manager) }
            flat(department) { name }
            retries: Int = 3
        }
    "#,
    );

    let input = &types[0];
    assert_eq!(
        input.property_names(),
        vec!["id", "firstName", "lastName", "bossManagerId", "departmentName", "note", "retries"]
    );
    assert_eq!(input.property("bossManagerId").unwrap().source(), Id::new("manager"));
    assert!(input.user_property("note").unwrap().is_nullable());
    assert!(!input.user_property("retries").unwrap().is_nullable());

    let err = compile_source(
        "export hr.Employee\nView { flat(manager) { id, note: String? } }",
        &CompileConfig::default(),
    )
    .expect_err("user-defined properties cannot be flattened");
    assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E207));
    assert_eq!(first_kind(&err), ErrorKind::Semantic);
}

#[test]
fn test_compile_error_on_unknown_entity() {
    let err = compile_source("export hr.Nothing\nView { id }", &CompileConfig::default())
        .expect_err("unknown entity");
    assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E308));
    assert_eq!(first_kind(&err), ErrorKind::UnknownEntity);
    assert_ne!(first_kind(&err), ErrorKind::UnresolvedProperty);
}

mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    const DEPARTMENT_PROPERTIES: [&str; 4] = ["id", "name", "employees", "employeeIds"];

    // ===================
    // Strategies
    // ===================

    /// A non-empty selection of department properties in arbitrary order.
    fn selection_strategy() -> impl Strategy<Value = Vec<&'static str>> {
        prop::sample::subsequence(DEPARTMENT_PROPERTIES.to_vec(), 1..=DEPARTMENT_PROPERTIES.len())
            .prop_shuffle()
    }

    // ===================
    // Property Test Functions
    // ===================

    /// The output keeps the declared order and drops nothing.
    fn check_selection_order(selection: &[&str]) -> Result<(), TestCaseError> {
        let source = format!("export hr.Department\nView {{ {} }}", selection.join(", "));
        let types = compile_source(&source, &CompileConfig::default());

        prop_assert!(types.is_ok(), "Failed to compile `{source}`: {:?}", types.err());
        let types = types.unwrap();
        prop_assert_eq!(types[0].property_names(), selection.to_vec());
        Ok(())
    }

    /// Compiling the same source twice yields identical types.
    fn check_idempotent(selection: &[&str], mutable: bool) -> Result<(), TestCaseError> {
        let source = format!("export hr.Department\nView {{ {} }}", selection.join("\n"));
        let config = CompileConfig {
            mutable,
            ..CompileConfig::default()
        };
        let first = compile_source(&source, &config).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let second = compile_source(&source, &config).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(first, second);
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn selection_order_is_preserved(selection in selection_strategy()) {
            check_selection_order(&selection)?;
        }

        #[test]
        fn compilation_is_idempotent(selection in selection_strategy(), mutable in any::<bool>()) {
            check_idempotent(&selection, mutable)?;
        }
    }
}
