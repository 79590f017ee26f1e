//! Kanban grouping of view tasks.

use crate::clickup::types::Task;

/// One status column of the board.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardColumn {
  pub status: String,
  pub color: String,
  pub order: i64,
  pub tasks: Vec<Task>,
}

/// Group tasks into status columns.
///
/// Columns are ordered by the highest `orderindex` seen for each status;
/// ties keep first-seen order. Tasks keep their input order within a column.
pub fn group_by_status(tasks: &[Task]) -> Vec<BoardColumn> {
  let mut columns: Vec<BoardColumn> = Vec::new();

  for task in tasks {
    let status = &task.status;
    match columns.iter_mut().find(|c| c.status == status.name) {
      Some(column) => {
        column.order = column.order.max(status.order);
        column.tasks.push(task.clone());
      }
      None => columns.push(BoardColumn {
        status: status.name.clone(),
        color: status.color.clone(),
        order: status.order,
        tasks: vec![task.clone()],
      }),
    }
  }

  columns.sort_by_key(|c| c.order);
  columns
}
