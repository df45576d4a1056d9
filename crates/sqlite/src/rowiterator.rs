use crate::{Result, Row, Statement};

/// Forward cursor over the rows of a statement.
///
/// An active cursor refers to a statement that currently has a row available, an exhausted
/// cursor refers to nothing. All exhausted cursors compare equal, which makes [`end`] the
/// canonical end marker.
///
/// Each row is only valid until the cursor advances, rows are not meant to be collected.
#[derive(Debug, Clone, Copy)]
pub enum RowIterator<'s, 'a> {
    Active {
        statement: &'s Statement<'a>,
        /// The current row has not been handed out by [`Iterator::next`] yet.
        pending: bool,
    },
    Exhausted,
}

/// Steps `statement` once and returns a cursor positioned on the first row, if any.
pub fn begin<'s, 'a>(statement: &'s Statement<'a>) -> Result<RowIterator<'s, 'a>> {
    RowIterator::begin(statement)
}

pub fn end<'s, 'a>(_statement: &'s Statement<'a>) -> RowIterator<'s, 'a> {
    RowIterator::Exhausted
}

impl<'s, 'a> RowIterator<'s, 'a> {
    pub fn begin(statement: &'s Statement<'a>) -> Result<Self> {
        Ok(if statement.step()? {
            RowIterator::Active {
                statement,
                pending: true,
            }
        } else {
            RowIterator::Exhausted
        })
    }

    pub fn end() -> Self {
        RowIterator::Exhausted
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RowIterator::Exhausted)
    }

    pub fn row(&self) -> Option<Row<'s>> {
        match *self {
            RowIterator::Active { statement, .. } => Some(statement.row()),
            RowIterator::Exhausted => None,
        }
    }

    /// Steps to the next row. Advancing an exhausted cursor does nothing.
    ///
    /// A failing step exhausts the cursor and returns the error.
    pub fn advance(&mut self) -> Result<()> {
        if let RowIterator::Active { statement, pending } = self {
            match statement.step() {
                Ok(true) => *pending = true,
                Ok(false) => *self = RowIterator::Exhausted,
                Err(err) => {
                    *self = RowIterator::Exhausted;
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}

impl PartialEq for RowIterator<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RowIterator::Exhausted, RowIterator::Exhausted) => true,
            (RowIterator::Active { statement: lhs, .. }, RowIterator::Active { statement: rhs, .. }) => {
                std::ptr::eq(*lhs, *rhs)
            }
            _ => false,
        }
    }
}

impl<'s> Iterator for RowIterator<'s, '_> {
    type Item = Result<Row<'s>>;

    fn next(&mut self) -> Option<Self::Item> {
        let RowIterator::Active { pending, .. } = self else {
            return None;
        };

        if !*pending {
            if let Err(err) = self.advance() {
                return Some(Err(err));
            }
        }

        match self {
            RowIterator::Active { statement, pending } => {
                *pending = false;
                let statement: &'s Statement<'_> = *statement;
                Some(Ok(statement.row()))
            }
            RowIterator::Exhausted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Connection, Reader};

    fn numbers(conn: &Connection) -> Result<Statement<'_>> {
        Statement::new(conn, "select 1 union all select 2 union all select 3", ())
    }

    #[test_log::test]
    fn begin_on_empty_result_is_end() -> Result<()> {
        let conn = Connection::memory()?;
        let stmt = Statement::new(&conn, "select 1 where 0", ())?;
        let it = begin(&stmt)?;
        assert!(it.is_exhausted());
        assert_eq!(it, end(&stmt));
        assert!(it.row().is_none());
        Ok(())
    }

    #[test_log::test]
    fn manual_cursor_protocol() -> Result<()> {
        let conn = Connection::memory()?;
        let stmt = numbers(&conn)?;

        let mut values = Vec::new();
        let mut it = begin(&stmt)?;
        while it != end(&stmt) {
            let row = it.row().expect("active cursor has a row");
            values.push(row.get_int(0));
            it.advance()?;
        }

        assert_eq!(values, vec![1, 2, 3]);
        it.advance()?;
        assert!(it.is_exhausted());
        Ok(())
    }

    #[test_log::test]
    fn equality_depends_on_state_and_statement() -> Result<()> {
        let conn = Connection::memory()?;
        let first = numbers(&conn)?;
        let second = numbers(&conn)?;

        let a = begin(&first)?;
        let b = begin(&second)?;
        assert_eq!(a, a);
        assert_ne!(a, b);
        assert_ne!(a, RowIterator::end());
        assert_eq!(end(&first), end(&second));
        Ok(())
    }

    #[test_log::test]
    fn for_loop_visits_every_row() -> Result<()> {
        let conn = Connection::memory()?;
        let stmt = numbers(&conn)?;

        let mut values = Vec::new();
        for row in stmt.rows()? {
            values.push(row?.get_int(0));
        }

        assert_eq!(values, vec![1, 2, 3]);
        assert!(!stmt.step()?);
        Ok(())
    }

    #[test_log::test]
    fn iteration_matches_manual_stepping() -> Result<()> {
        let conn = Connection::memory()?;
        conn.execute_batch(
            "create table Things (Id integer, Name text);
             insert into Things values (3, 'c'), (1, 'a'), (2, 'b');",
        )?;
        let sql = "select Id, Name from Things order by Id";

        let stepped = Statement::new(&conn, sql, ())?;
        let mut expected = Vec::new();
        while stepped.step()? {
            expected.push((stepped.get_int(0), stepped.get_string(1)));
        }

        let iterated = Statement::new(&conn, sql, ())?;
        let actual = iterated
            .rows()?
            .map(|row| row.map(|row| (row.get_int(0), row.get_string(1))))
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(actual, expected);
        assert_eq!(actual.len(), 3);
        Ok(())
    }

    #[test_log::test]
    fn step_error_ends_iteration() -> Result<()> {
        let conn = Connection::memory()?;
        conn.execute_batch(
            "create table Things (x integer);
             insert into Things values (1), (-9223372036854775807 - 1);",
        )?;
        let stmt = Statement::new(&conn, "select abs(x) from Things order by rowid", ())?;

        let mut it = stmt.rows()?;
        assert_eq!(it.next().map(|row| row.map(|row| row.get_int(0))), Some(Ok(1)));

        let err = it.next().expect("error item").unwrap_err();
        assert!(err.message().contains("integer overflow"));
        assert!(it.next().is_none());
        Ok(())
    }
}
