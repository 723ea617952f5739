mod spinner;
mod status;
mod table;

pub use spinner::{bounded_bar, with_spinner};

pub use status::{print_command_status, CommandStatus};

pub use table::{header, styled_table};
