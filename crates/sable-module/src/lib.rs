//! Sable module files.
//!
//! A module file carries the exported declarations of one bound unit so
//! that another unit can bind against them without the source:
//!
//! - [`format`]: byte-level reader and writer, header and record tags
//! - [`image`]: the in-memory form of a module file
//! - [`writer`]: capture the exported part of a symbol table
//! - [`link`]: link an image into a table, back-patching forward references
//!
//! Import is transactional. The image is linked into a staging copy of the
//! table and the copy replaces the table only when linking succeeds, so a
//! corrupt or unresolvable module leaves the importer untouched.

pub mod format;
pub mod image;
pub mod link;
pub mod writer;

pub use image::ModuleImage;
pub use link::{ImportSummary, Linker};
pub use writer::ModuleWriter;

use sable_core::{Result, UnitSettings};
use sable_registry::SymbolTable;
use tracing::{debug, warn};

/// Serialize the exported symbols of `table`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn export_module(table: &SymbolTable, settings: &UnitSettings) -> Result<Vec<u8>> {
    let bytes = ModuleWriter::new(table, settings).capture()?.encode()?;
    debug!(unit = %settings.unit_name, bytes = bytes.len(), "module exported");
    Ok(bytes)
}

/// Link a module file into `table`.
///
/// On error `table` is unchanged.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn import_module(table: &mut SymbolTable, bytes: &[u8], settings: &UnitSettings) -> Result<ImportSummary> {
    let image = ModuleImage::decode(bytes, settings.module_version).inspect_err(|err| {
        warn!(unit = %settings.unit_name, %err, "module rejected");
    })?;
    let mut staging = table.clone();
    let summary = Linker::new(&mut staging).link(&image)?;
    *table = staging;
    debug!(
        unit = %settings.unit_name,
        symbols = summary.symbols,
        instances = summary.instances,
        replicas = summary.replicas,
        "module imported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordered_float::OrderedFloat;
    use sable_compiler::{BindContext, bind_unit};
    use sable_core::{Access, ModuleVersion, QualifiedName, SemanticError, SymbolFlags};
    use sable_registry::{BuiltinType, SymbolKind};
    use sable_syntax::{
        Block, ClassDecl, ConstantDecl, Expr, FunctionDecl, Item, Literal, NamespaceDecl, SourceFile, Specifiers,
        Stmt, TypeExpr, TypeParam, VariableDecl,
    };

    fn bind(settings: UnitSettings, table: Option<SymbolTable>, items: Vec<Item>) -> BindContext {
        let file = settings.file_index_base;
        let mut ctx = match table {
            Some(table) => BindContext::with_table(table, settings),
            None => BindContext::new(settings),
        };
        bind_unit(&mut ctx, &[SourceFile::new(file, items)]).unwrap();
        ctx
    }

    fn export(ctx: &BindContext) -> Vec<u8> {
        export_module(&ctx.table, &ctx.settings).unwrap()
    }

    fn lookup(table: &SymbolTable, name: &str) -> sable_registry::SymbolId {
        table.lookup_qualified(&QualifiedName::parse(name)).unwrap()
    }

    fn widget_unit() -> Vec<Item> {
        let widget = ClassDecl::new("Widget")
            .member(Item::Variable(VariableDecl::new("size", TypeExpr::named("int"))))
            .member(Item::Function(
                FunctionDecl::new("grow", TypeExpr::named("void"))
                    .specifiers(Specifiers::VIRTUAL)
                    .body(Block::default()),
            ))
            .member(Item::Variable(
                VariableDecl::new("secret", TypeExpr::named("int")).access(Access::Private),
            ));
        vec![Item::Namespace(NamespaceDecl::new(
            "ui",
            vec![
                Item::Class(widget),
                Item::Function(
                    FunctionDecl::new("make", TypeExpr::named("Widget").pointer())
                        .param("size", TypeExpr::named("int"))
                        .body(Block::new(vec![Stmt::ret(Some(Expr::null()))])),
                ),
                Item::Constant(ConstantDecl::new("scale", TypeExpr::named("double"), Expr::float(1.5))),
            ],
        ))]
    }

    #[test]
    fn exported_symbols_survive_import() {
        let ctx = bind(UnitSettings::default(), None, widget_unit());
        let bytes = export(&ctx);

        let mut table = SymbolTable::new();
        import_module(&mut table, &bytes, &UnitSettings::default()).unwrap();

        let widget = lookup(&table, "ui.Widget");
        let data = table.symbol(widget).as_class().unwrap();
        assert_eq!(data.member_variables.len(), 2);
        assert_eq!(data.vtable.len(), 1);
        assert!(table.symbol(widget).has(SymbolFlags::EXTERNAL));

        let make = table.group_functions(lookup(&table, "ui.make"))[0];
        let ret = table.symbol(make).as_function().unwrap().return_type;
        assert_eq!(table.type_name(ret), "ui.Widget*");

        let scale = lookup(&table, "ui.scale");
        let SymbolKind::Constant(constant) = &table.symbol(scale).kind else {
            panic!("expected a constant");
        };
        assert_eq!(constant.value, Some(Literal::Float(OrderedFloat(1.5))));
        assert_eq!(constant.ty, table.builtin(BuiltinType::Double));
    }

    #[test]
    fn imported_declarations_bind_in_the_next_unit() {
        let first = bind(UnitSettings::default(), None, widget_unit());
        let bytes = export(&first);

        let settings = UnitSettings::default().with_file_index_base(1);
        let mut table = SymbolTable::new();
        import_module(&mut table, &bytes, &settings).unwrap();
        let main = FunctionDecl::new("main", TypeExpr::named("void")).body(Block::new(vec![
            Stmt::local("w", TypeExpr::named("ui.Widget").pointer(), Some(Expr::call("ui.make", vec![Expr::int(3)]))),
        ]));
        let second = bind(settings, Some(table), vec![Item::Function(main)]);

        // Imported symbols are not exported again.
        let image = ModuleWriter::new(&second.table, &second.settings).capture().unwrap();
        let names: Vec<_> = image.symbols.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["main"]);
    }

    #[test]
    fn template_replicas_are_relinked() {
        let id = FunctionDecl::new("id", TypeExpr::named("T"))
            .type_param(TypeParam::new("T"))
            .param("x", TypeExpr::named("T"))
            .body(Block::new(vec![Stmt::ret(Some(Expr::ident("x")))]));
        let main = FunctionDecl::new("main", TypeExpr::named("void"))
            .body(Block::new(vec![Stmt::Expr(Expr::call("id", vec![Expr::int(1)]))]));
        let ctx = bind(UnitSettings::default(), None, vec![Item::Function(id), Item::Function(main)]);
        let bytes = export(&ctx);

        let mut table = SymbolTable::new();
        let summary = import_module(&mut table, &bytes, &UnitSettings::default()).unwrap();
        assert_eq!(summary.replicas, 1);

        let generic = table.group_functions(lookup(&table, "id"))[0];
        let int = BuiltinType::Int.type_id();
        let replica = table.function_replica(generic, &[int]).unwrap();
        let data = table.symbol(replica).as_function().unwrap();
        assert_eq!(data.return_type, table.builtin(BuiltinType::Int));
        assert!(table.symbol(replica).has(SymbolFlags::EXTERNAL));
    }

    #[test]
    fn replicas_relink_beside_imported_overloads() {
        let library = FunctionDecl::new("f", TypeExpr::named("void"))
            .param("x", TypeExpr::named("int"))
            .body(Block::default());
        let first = bind(UnitSettings::default(), None, vec![Item::Function(library)]);
        let first_bytes = export(&first);

        let settings = UnitSettings::default().with_file_index_base(1);
        let mut table = SymbolTable::new();
        import_module(&mut table, &first_bytes, &settings).unwrap();
        let generic = FunctionDecl::new("f", TypeExpr::named("T"))
            .type_param(TypeParam::new("T"))
            .param("x", TypeExpr::named("T"))
            .body(Block::new(vec![Stmt::ret(Some(Expr::ident("x")))]));
        let main = FunctionDecl::new("main", TypeExpr::named("void"))
            .body(Block::new(vec![Stmt::Expr(Expr::call("f", vec![Expr::float(1.5)]))]));
        let second = bind(settings, Some(table), vec![Item::Function(generic), Item::Function(main)]);
        let second_bytes = export(&second);

        // The generic sits behind the imported overload in the exporting
        // unit but alone in the group here.
        let mut fresh = SymbolTable::new();
        let summary = import_module(&mut fresh, &second_bytes, &UnitSettings::default()).unwrap();
        assert_eq!(summary.replicas, 1);
        let functions = fresh.group_functions(lookup(&fresh, "f"));
        assert_eq!(functions.len(), 1);
        let double = BuiltinType::Double.type_id();
        assert!(fresh.function_replica(functions[0], &[double]).is_some());

        // Both modules together, in either order.
        for order in [[&first_bytes, &second_bytes], [&second_bytes, &first_bytes]] {
            let mut table = SymbolTable::new();
            for bytes in order {
                import_module(&mut table, bytes, &UnitSettings::default()).unwrap();
            }
            let group = lookup(&table, "f");
            let generic = table
                .group_functions(group)
                .iter()
                .copied()
                .find(|f| table.symbol(*f).as_function().unwrap().is_generic())
                .unwrap();
            assert!(table.function_replica(generic, &[double]).is_some());
        }
    }

    #[test]
    fn class_instances_are_shared() {
        let boxed = ClassDecl::new("Box")
            .type_param(TypeParam::new("T"))
            .member(Item::Variable(VariableDecl::new("value", TypeExpr::named("T"))));
        let holder = VariableDecl::new("held", TypeExpr::generic("Box", vec![TypeExpr::named("int")]));
        let ctx = bind(
            UnitSettings::default(),
            None,
            vec![Item::Class(boxed), Item::Variable(holder)],
        );
        let bytes = export(&ctx);

        let mut table = SymbolTable::new();
        import_module(&mut table, &bytes, &UnitSettings::default()).unwrap();
        let held = lookup(&table, "held");
        let ty = table.symbol(held).value_type().unwrap();
        assert_eq!(table.type_name(ty), "Box<int>");
        let instance = table.symbol(ty).as_class().unwrap().instance.as_ref().unwrap();
        assert_eq!(instance.subject, lookup(&table, "Box"));
    }

    #[test]
    fn missing_dependency_is_unresolved_and_table_untouched() {
        let base = bind(UnitSettings::default(), None, widget_unit());
        let base_bytes = export(&base);

        let settings = UnitSettings::default().with_file_index_base(1);
        let mut table = SymbolTable::new();
        import_module(&mut table, &base_bytes, &settings).unwrap();
        let holder = VariableDecl::new("current", TypeExpr::named("ui.Widget").pointer());
        let dependent = bind(settings, Some(table), vec![Item::Variable(holder)]);
        let dependent_bytes = export(&dependent);

        let mut fresh = SymbolTable::new();
        let before = fresh.symbol_count();
        let err = import_module(&mut fresh, &dependent_bytes, &UnitSettings::default()).unwrap_err();
        let widget = lookup(&dependent.table, "ui.Widget");
        assert!(matches!(
            err,
            SemanticError::UnresolvedType { type_id, .. } if type_id == dependent.table.type_id_of(widget).unwrap()
        ));
        assert_eq!(fresh.symbol_count(), before);
    }

    #[test]
    fn rejected_files_leave_table_untouched() {
        let ctx = bind(UnitSettings::default(), None, widget_unit());
        let mut bytes = export(&ctx);
        let mut table = SymbolTable::new();
        let before = table.symbol_count();

        let newer = UnitSettings::default().with_module_version(ModuleVersion::new(2, 0));
        let err = import_module(&mut table, &bytes, &newer).unwrap_err();
        assert!(matches!(err, SemanticError::ModuleVersionMismatch { .. }));

        bytes[0] ^= 0xff;
        let err = import_module(&mut table, &bytes, &UnitSettings::default()).unwrap_err();
        assert!(matches!(err, SemanticError::CorruptModuleFile { .. }));

        let truncated = &export(&ctx)[..12];
        assert!(import_module(&mut table, truncated, &UnitSettings::default()).is_err());
        assert_eq!(table.symbol_count(), before);
    }

    #[test]
    fn importing_twice_is_a_duplicate() {
        let ctx = bind(UnitSettings::default(), None, widget_unit());
        let bytes = export(&ctx);
        let mut table = SymbolTable::new();
        import_module(&mut table, &bytes, &UnitSettings::default()).unwrap();
        let count = table.symbol_count();
        let err = import_module(&mut table, &bytes, &UnitSettings::default()).unwrap_err();
        assert!(matches!(err, SemanticError::DuplicateDefinition { .. }));
        assert_eq!(table.symbol_count(), count);
    }
}
