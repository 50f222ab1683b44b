/*
[INPUT]:  Interactive CLI commands
[OUTPUT]: Command implementations used by the binary
[POS]:    CLI layer - module wiring
[UPDATE]: When adding interactive commands
*/

pub mod init;
