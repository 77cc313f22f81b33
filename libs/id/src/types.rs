//! Typed ID definitions.

use crate::define_id;

// =============================================================================
// Instances
// =============================================================================

// The identity correlating an Instance with its workload. Assigned once.
define_id!(InstanceUid);

// =============================================================================
// Messages
// =============================================================================

// Unique per bus send.
define_id!(MessageId);
