mod beat_id;
mod commands;
mod sequence;
