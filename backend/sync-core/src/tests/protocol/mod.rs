mod command;
mod envelope;
mod topics;
