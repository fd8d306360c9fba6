#[macro_export]
macro_rules! drop_table {
    ($table:ident, $manager:ident) => {
        $manager
            .drop_table(Table::drop().table($table::Table).if_exists().to_owned())
            .await?
    };
}

/// Unique index over the given columns, created separately from the table so
/// SQLite accepts it.
#[macro_export]
macro_rules! unique_index {
    ($manager:ident, $name:literal, $table:ident, [$($col:expr),+ $(,)?]) => {
        $manager
            .create_index(
                Index::create()
                    .name($name)
                    .table($table::Table)
                    $(.col($col))+
                    .unique()
                    .to_owned(),
            )
            .await?
    };
}

pub(crate) use drop_table;
pub(crate) use unique_index;
