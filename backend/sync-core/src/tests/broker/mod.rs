mod router;
mod session;
