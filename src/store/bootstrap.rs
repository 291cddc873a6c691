//! Schema DDL derived from the registries.

use crate::fields::{ColumnType, FieldRegistry};
use crate::model::{EntityType, NavigationProperty};
use crate::schema::{JoinShape, SchemaRegistry};
use crate::sql::{ColumnDef, CreateTable, DataType, Dialect, ReferentialAction, TableConstraint};

/// CREATE TABLE statements for every entity and link table, in an order
/// where referenced tables come first.
pub fn schema_statements(schema: &SchemaRegistry, fields: &FieldRegistry) -> Vec<CreateTable> {
    let mut statements: Vec<CreateTable> = SchemaRegistry::CREATION_ORDER
        .iter()
        .map(|ty| entity_table(schema, fields, *ty))
        .collect();

    for (relation, link) in schema.link_tables() {
        let source_table = schema.table(relation.source);
        let target_table = schema.table(relation.target);
        let mut table = CreateTable::new(link.table)
            .if_not_exists()
            .column(ColumnDef::new(link.source_column, DataType::Int64).not_null())
            .column(ColumnDef::new(link.target_column, DataType::Int64).not_null());
        if let Some(rank) = link.rank_column {
            table = table.column(ColumnDef::new(rank, DataType::Int64).not_null());
        }
        statements.push(
            table
                .constraint(TableConstraint::primary_key([
                    link.source_column,
                    link.target_column,
                ]))
                .constraint(
                    TableConstraint::foreign_key([link.source_column], source_table, ["id"])
                        .on_delete(ReferentialAction::Cascade),
                )
                .constraint(
                    TableConstraint::foreign_key([link.target_column], target_table, ["id"])
                        .on_delete(ReferentialAction::Cascade),
                ),
        );
    }
    statements
}

fn entity_table(
    schema: &SchemaRegistry,
    fields: &FieldRegistry,
    entity_type: EntityType,
) -> CreateTable {
    let generated_foi = fields.generated_foi_column();
    let features = schema.table(EntityType::FeatureOfInterest);
    let mut table = CreateTable::new(schema.table(entity_type)).if_not_exists();

    for column in fields.layout(entity_type).columns() {
        let def = ColumnDef::new(column.name, column.column_type.data_type());
        let def = match column.column_type {
            ColumnType::Id => def.primary_key().identity(),
            _ if entity_type == EntityType::Location && column.name == generated_foi.name => {
                def.references_on_delete(features, "id", ReferentialAction::SetNull)
            }
            ColumnType::Integer => match foreign_key(schema, entity_type, column.name) {
                Some((target, required)) => {
                    let def = def.references(schema.table(target), "id");
                    if required {
                        def.not_null()
                    } else {
                        def
                    }
                }
                None => def,
            },
            _ => def,
        };
        table = table.column(def);
    }
    table
}

/// Target and nullability of a foreign key column.
fn foreign_key(
    schema: &SchemaRegistry,
    entity_type: EntityType,
    column: &str,
) -> Option<(EntityType, bool)> {
    schema.relations(entity_type).find_map(|r| match r.join {
        JoinShape::SourceForeignKey { column: c } if c == column => {
            // every stored observation has a feature, generated if need be
            let always_set = entity_type == EntityType::Observation
                && r.navigation == NavigationProperty::FeatureOfInterest;
            Some((r.target, r.required || always_set))
        }
        _ => None,
    })
}

/// The full schema rendered for `dialect`, one statement per line group.
pub fn schema_ddl(schema: &SchemaRegistry, fields: &FieldRegistry, dialect: Dialect) -> String {
    schema_statements(schema, fields)
        .iter()
        .map(|s| format!("{};", s.to_sql(dialect)))
        .collect::<Vec<_>>()
        .join("\n\n")
}
