/// Environment variable access used for `${VAR}` substitution in config files.
pub mod env;
