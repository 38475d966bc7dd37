//! Integration tests for sable using `Unit` as the entry point.
//!
//! Each test builds declaration trees the way a parser would hand them
//! over, binds them, and checks the resulting symbol table.

use sable::prelude::*;
use sable::sable_core::{Access, Derivation};
use sable::sable_registry::{BuiltinType, SymbolKind};
use sable::sable_syntax::{
    Block, ClassDecl, Expr, FunctionDecl, Item, NamespaceDecl, Specifiers, Stmt, TypeExpr, TypeParam,
    TypedefDecl, VariableDecl,
};

fn void() -> TypeExpr {
    TypeExpr::named("void")
}

fn bind(items: Vec<Item>) -> Unit {
    let mut unit = Unit::default();
    unit.add_file(SourceFile::new(0, items)).unwrap();
    unit.bind().unwrap();
    unit
}

fn bind_err(items: Vec<Item>) -> Vec<SemanticError> {
    let mut unit = Unit::default();
    unit.add_file(SourceFile::new(0, items)).unwrap();
    unit.bind().unwrap_err().into_errors()
}

fn overload(unit: &Unit, name: &str, index: usize) -> SymbolId {
    let group = unit.lookup(name).unwrap();
    unit.table().group_functions(group)[index]
}

fn callee_of_first_call(unit: &Unit, function: &str) -> Option<SymbolId> {
    let main = overload(unit, function, 0);
    unit.body(main).unwrap().calls().first().and_then(|c| c.callee())
}

fn variable_type(unit: &Unit, name: &str) -> SymbolId {
    let id = unit.lookup(name).unwrap();
    unit.table().symbol(id).value_type().unwrap()
}

// =============================================================================
// Type identity
// =============================================================================

#[test]
fn test_type_id_is_structural() {
    let int = BuiltinType::Int.type_id();
    let a = TypeId::derived(int, &[Derivation::Const, Derivation::Pointer]);
    let b = TypeId::derived(int, &[Derivation::Const, Derivation::Pointer]);
    let c = TypeId::derived(int, &[Derivation::Pointer, Derivation::Const]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    let instance = TypeId::template_instance(int, &[BuiltinType::Double.type_id()]);
    assert_ne!(instance, TypeId::derived(int, &[Derivation::Array]));
    assert_eq!(instance, TypeId::template_instance(int, &[BuiltinType::Double.type_id()]));
}

#[test]
fn test_make_derived_type_is_idempotent() {
    let mut table = SymbolTable::new();
    let double = table.builtin(BuiltinType::Double);
    let first = table.make_derived_type(double, &[Derivation::Array], Span::default()).unwrap();
    let count = table.symbol_count();
    let second = table.make_derived_type(double, &[Derivation::Array], Span::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(table.symbol_count(), count);
}

// =============================================================================
// Scopes
// =============================================================================

#[test]
fn test_lookup_finds_installed_symbols() {
    let unit = bind(vec![Item::Namespace(NamespaceDecl::new(
        "geo",
        vec![Item::Class(
            ClassDecl::new("Point").member(Item::Variable(VariableDecl::new("x", TypeExpr::named("float")))),
        )],
    ))]);
    let point = unit.lookup("geo.Point").unwrap();
    assert_eq!(unit.table().symbol(point).name, "Point");
    let x = unit.lookup("geo.Point.x").unwrap();
    assert_eq!(unit.table().symbol(x).parent, Some(point));
    assert!(unit.lookup("geo.Missing").is_none());
    assert!(unit.lookup("geo.Point.x.y").is_none());
}

#[test]
fn test_duplicates_in_one_scope_are_reported() {
    let first = Span::new(0, 1, 0, 10);
    let second = Span::new(0, 2, 0, 10);
    let errors = bind_err(vec![
        Item::Variable(VariableDecl::new("count", TypeExpr::named("int")).at(first)),
        Item::Class(ClassDecl::new("count").at(second)),
    ]);
    assert_eq!(
        errors,
        [SemanticError::DuplicateDefinition {
            name: "count".to_string(),
            span: second,
            previous: first,
        }]
    );
}

#[test]
fn test_overloads_with_one_signature_are_duplicates() {
    let first = Span::new(0, 1, 0, 16);
    let second = Span::new(0, 2, 0, 16);
    let errors = bind_err(vec![
        Item::Function(FunctionDecl::new("f", void()).param("x", TypeExpr::named("int")).body(Block::default()).at(first)),
        Item::Function(FunctionDecl::new("f", void()).param("y", TypeExpr::named("int")).body(Block::default()).at(second)),
    ]);
    assert_eq!(
        errors,
        [SemanticError::DuplicateDefinition {
            name: "f".to_string(),
            span: second,
            previous: first,
        }]
    );
}

// =============================================================================
// Overload resolution
// =============================================================================

#[test]
fn test_identity_beats_standard_conversion() {
    let unit = bind(vec![
        Item::Function(FunctionDecl::new("f", void()).param("x", TypeExpr::named("double")).body(Block::default())),
        Item::Function(FunctionDecl::new("f", void()).param("x", TypeExpr::named("int")).body(Block::default())),
        Item::Function(
            FunctionDecl::new("main", void()).body(Block::new(vec![Stmt::Expr(Expr::call("f", vec![Expr::int(7)]))])),
        ),
    ]);
    assert_eq!(callee_of_first_call(&unit, "main"), Some(overload(&unit, "f", 1)));
}

#[test]
fn test_shorter_inheritance_distance_wins() {
    let unit = bind(vec![
        Item::Class(ClassDecl::new("Base")),
        Item::Class(ClassDecl::new("Derived").base(TypeExpr::named("Base"))),
        Item::Function(
            FunctionDecl::new("f", void()).param("x", TypeExpr::named("Base").lvalue_ref()).body(Block::default()),
        ),
        Item::Function(
            FunctionDecl::new("f", void()).param("x", TypeExpr::named("Derived").lvalue_ref()).body(Block::default()),
        ),
        Item::Function(FunctionDecl::new("main", void()).body(Block::new(vec![
            Stmt::local("d", TypeExpr::named("Derived"), None),
            Stmt::Expr(Expr::call("f", vec![Expr::ident("d")])),
        ]))),
    ]);
    assert_eq!(callee_of_first_call(&unit, "main"), Some(overload(&unit, "f", 1)));
}

#[test]
fn test_incomparable_candidates_are_ambiguous() {
    let a = Span::new(0, 1, 0, 20);
    let b = Span::new(0, 2, 0, 20);
    let errors = bind_err(vec![
        Item::Function(
            FunctionDecl::new("f", void())
                .param("x", TypeExpr::named("int"))
                .param("y", TypeExpr::named("double"))
                .body(Block::default())
                .at(a),
        ),
        Item::Function(
            FunctionDecl::new("f", void())
                .param("x", TypeExpr::named("double"))
                .param("y", TypeExpr::named("int"))
                .body(Block::default())
                .at(b),
        ),
        Item::Function(FunctionDecl::new("main", void()).body(Block::new(vec![Stmt::Expr(Expr::call(
            "f",
            vec![Expr::int(1), Expr::int(2)],
        ))]))),
    ]);
    let [SemanticError::AmbiguousOverload { candidate_spans, .. }] = errors.as_slice() else {
        panic!("expected one ambiguity, got {errors:?}");
    };
    assert_eq!(candidate_spans, &[a, b]);
}

#[test]
fn test_no_viable_overload_lists_candidates() {
    let declared = Span::new(0, 1, 0, 20);
    let errors = bind_err(vec![
        Item::Class(ClassDecl::new("Widget")),
        Item::Function(
            FunctionDecl::new("f", void())
                .param("w", TypeExpr::named("Widget").pointer())
                .body(Block::default())
                .at(declared),
        ),
        Item::Function(
            FunctionDecl::new("main", void())
                .body(Block::new(vec![Stmt::Expr(Expr::call("f", vec![Expr::float(2.0)]))])),
        ),
    ]);
    let [SemanticError::NoViableOverload { candidate_spans, .. }] = errors.as_slice() else {
        panic!("expected no viable overload, got {errors:?}");
    };
    assert_eq!(candidate_spans, &[declared]);
}

// =============================================================================
// Templates
// =============================================================================

fn stack() -> Item {
    Item::Class(
        ClassDecl::new("Stack")
            .type_param(TypeParam::new("T"))
            .member(Item::Variable(VariableDecl::new("top", TypeExpr::named("T")))),
    )
}

#[test]
fn test_template_instances_are_cached() {
    let int_stack = || TypeExpr::generic("Stack", vec![TypeExpr::named("int")]);
    let unit = bind(vec![
        stack(),
        Item::Variable(VariableDecl::new("a", int_stack())),
        Item::Variable(VariableDecl::new("b", int_stack())),
        Item::Variable(VariableDecl::new("c", TypeExpr::generic("Stack", vec![TypeExpr::named("double")]))),
    ]);
    let (a, b, c) = (variable_type(&unit, "a"), variable_type(&unit, "b"), variable_type(&unit, "c"));
    assert_eq!(a, b);
    assert_ne!(a, c);
    let table = unit.table();
    assert_ne!(table.type_id_of(a).unwrap(), table.type_id_of(c).unwrap());
    assert_eq!(table.type_name(c), "Stack<double>");
}

#[test]
fn test_missing_type_argument_is_reported() {
    let errors = bind_err(vec![stack(), Item::Variable(VariableDecl::new("s", TypeExpr::named("Stack")))]);
    assert!(
        matches!(errors.as_slice(), [SemanticError::MissingTypeArgument { parameter, .. }] if parameter == "T"),
        "{errors:?}"
    );
}

#[test]
fn test_default_type_argument_uses_earlier_parameters() {
    let pair = ClassDecl::new("Pair")
        .type_param(TypeParam::new("K"))
        .type_param(TypeParam::with_default("V", TypeExpr::named("K")))
        .member(Item::Variable(VariableDecl::new("second", TypeExpr::named("V"))));
    let unit = bind(vec![
        Item::Class(pair),
        Item::Variable(VariableDecl::new("p", TypeExpr::generic("Pair", vec![TypeExpr::named("int")]))),
    ]);
    let p = variable_type(&unit, "p");
    assert_eq!(unit.table().type_name(p), "Pair<int, int>");
}

/// `Box<T>` whose virtual member refers to a name that does not exist.
fn broken_box() -> Item {
    Item::Class(
        ClassDecl::new("Box")
            .type_param(TypeParam::new("T"))
            .member(Item::Variable(VariableDecl::new("value", TypeExpr::named("T"))))
            .member(Item::Function(
                FunctionDecl::new("get", TypeExpr::named("T"))
                    .specifiers(Specifiers::VIRTUAL)
                    .body(Block::new(vec![Stmt::ret(Some(Expr::ident("nope")))])),
            )),
    )
}

#[test]
fn test_instance_used_as_type_skips_virtual_bodies() {
    let unit = bind(vec![
        broken_box(),
        Item::Variable(VariableDecl::new("b", TypeExpr::generic("Box", vec![TypeExpr::named("int")]))),
    ]);
    let b = variable_type(&unit, "b");
    assert_eq!(unit.table().type_name(b), "Box<int>");
}

#[test]
fn test_constructing_instance_binds_virtual_bodies() {
    let errors = bind_err(vec![
        broken_box(),
        Item::Function(FunctionDecl::new("main", void()).body(Block::new(vec![Stmt::Expr(Expr::construct(
            TypeExpr::generic("Box", vec![TypeExpr::named("int")]),
            Vec::new(),
        ))]))),
    ]);
    assert!(
        matches!(errors.as_slice(), [SemanticError::SymbolNotFound { name, .. }] if name == "nope"),
        "{errors:?}"
    );
}

// =============================================================================
// Cycles
// =============================================================================

#[test]
fn test_typedef_cycle_is_detected() {
    let errors = bind_err(vec![
        Item::Typedef(TypedefDecl::new("A", TypeExpr::named("B"))),
        Item::Typedef(TypedefDecl::new("B", TypeExpr::named("A"))),
    ]);
    assert!(
        matches!(errors.as_slice(), [SemanticError::CyclicDefinition { .. }]),
        "{errors:?}"
    );
}

#[test]
fn test_inheritance_cycle_is_detected() {
    let errors = bind_err(vec![
        Item::Class(ClassDecl::new("A").base(TypeExpr::named("B"))),
        Item::Class(ClassDecl::new("B").base(TypeExpr::named("A"))),
    ]);
    assert!(
        matches!(errors.as_slice(), [SemanticError::CyclicDefinition { .. }]),
        "{errors:?}"
    );
}

// =============================================================================
// Modules
// =============================================================================

fn library() -> Vec<Item> {
    vec![Item::Namespace(NamespaceDecl::new(
        "lib",
        vec![
            Item::Class(
                ClassDecl::new("Buffer")
                    .member(Item::Variable(VariableDecl::new("length", TypeExpr::named("uint"))))
                    .member(Item::Variable(
                        VariableDecl::new("data", TypeExpr::named("byte").pointer()).access(Access::Private),
                    )),
            ),
            Item::Function(
                FunctionDecl::new("fill", void())
                    .param("buffer", TypeExpr::named("Buffer").lvalue_ref())
                    .param("value", TypeExpr::named("byte"))
                    .body(Block::default()),
            ),
            Item::Variable(VariableDecl::new("shared", TypeExpr::named("Buffer").constant().pointer())),
        ],
    ))]
}

fn exported_shape(table: &SymbolTable, container: SymbolId, out: &mut Vec<(String, String, Access)>) {
    for &child in table.children(container) {
        let symbol = table.symbol(child);
        let ty = match &symbol.kind {
            SymbolKind::FunctionGroup(group) => {
                for &f in &group.functions {
                    let data = table.symbol(f).as_function().unwrap();
                    let params: Vec<_> = data
                        .parameters
                        .iter()
                        .map(|p| table.type_name(table.symbol(*p).value_type().unwrap()))
                        .collect();
                    out.push((table.full_name(f), params.join(","), table.symbol(f).access));
                }
                continue;
            }
            _ => symbol.value_type().map(|t| table.type_name(t)).unwrap_or_default(),
        };
        out.push((table.full_name(child), ty, symbol.access));
        if symbol.scope().is_some() && !matches!(symbol.kind, SymbolKind::Function(_)) {
            exported_shape(table, child, out);
        }
    }
}

#[test]
fn test_module_round_trip_preserves_exported_symbols() {
    let library = bind(library());
    let bytes = library.export().unwrap();

    let mut consumer = Unit::new(UnitSettings::new("consumer").with_file_index_base(1));
    consumer.import(&bytes).unwrap();

    let mut original = Vec::new();
    exported_shape(library.table(), library.lookup("lib").unwrap(), &mut original);
    let mut imported = Vec::new();
    exported_shape(consumer.table(), consumer.lookup("lib").unwrap(), &mut imported);
    assert_eq!(original, imported);
    assert!(original.iter().any(|(name, ty, _)| name == "lib.shared" && ty == "const lib.Buffer*"));
}

#[test]
fn test_imported_functions_are_callable() {
    let library = bind(library());
    let bytes = library.export().unwrap();

    let mut consumer = Unit::new(UnitSettings::new("consumer").with_file_index_base(1));
    consumer.import(&bytes).unwrap();
    consumer
        .add_file(SourceFile::new(
            1,
            vec![Item::Function(FunctionDecl::new("main", void()).body(Block::new(vec![
                Stmt::local("b", TypeExpr::named("lib.Buffer"), None),
                Stmt::Expr(Expr::call("lib.fill", vec![Expr::ident("b"), Expr::int(0)])),
            ])))],
        ))
        .unwrap();
    consumer.bind().unwrap();
    let fill = overload(&consumer, "lib.fill", 0);
    assert_eq!(callee_of_first_call(&consumer, "main"), Some(fill));
}

#[test]
fn test_failed_import_leaves_unit_unmodified() {
    let library = bind(library());
    let mut bytes = library.export().unwrap();
    bytes[1] = b'X';

    let mut consumer = Unit::new(UnitSettings::new("consumer").with_file_index_base(1));
    let before = consumer.table().symbol_count();
    let err = consumer.import(&bytes).unwrap_err();
    assert!(matches!(err, UnitError::Module(SemanticError::CorruptModuleFile { .. })));
    assert_eq!(consumer.table().symbol_count(), before);
    assert!(consumer.lookup("lib").is_none());
}
