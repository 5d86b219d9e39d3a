pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const DATABASE: &str = "🗄️";
    pub const KEY: &str = "🔑";
    pub const LINK: &str = "🔗";
    pub const INDEX: &str = "📇";
    pub const BOLT: &str = "⚡";
    pub const GEAR: &str = "⚙️";
    pub const NOTE: &str = "📝";
}
