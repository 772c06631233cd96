// ============================================================================
// Integration tests for the docent console against an in-memory broker
// ============================================================================

mod docent;
