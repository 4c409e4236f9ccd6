//! Writes a deterministic sample sales dataset to `sample_sales.csv`,
//! including a few deliberately dirty cells to exercise coercion.

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `[0, bound)`.
    fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

struct Product {
    name: &'static str,
    category: &'static str,
    base_price: f64,
    base_margin: f64,
}

const PRODUCTS: [Product; 12] = [
    Product { name: "USB Hub", category: "Electronics", base_price: 29.9, base_margin: 0.22 },
    Product { name: "Laptop Stand", category: "Electronics", base_price: 89.0, base_margin: 0.31 },
    Product { name: "Wireless Mouse", category: "Electronics", base_price: 24.5, base_margin: 0.27 },
    Product { name: "Desk Lamp", category: "Home", base_price: 45.5, base_margin: 0.18 },
    Product { name: "Throw Blanket", category: "Home", base_price: 34.0, base_margin: 0.35 },
    Product { name: "Scented Candle", category: "Home", base_price: 12.0, base_margin: 0.45 },
    Product { name: "Yoga Mat", category: "Sports", base_price: 39.0, base_margin: 0.33 },
    Product { name: "Water Bottle", category: "Sports", base_price: 18.5, base_margin: 0.40 },
    Product { name: "Graphic Tee", category: "Apparel", base_price: 22.0, base_margin: 0.52 },
    Product { name: "Hoodie", category: "Apparel", base_price: 54.0, base_margin: 0.48 },
    Product { name: "Building Blocks", category: "Toys", base_price: 31.0, base_margin: 0.38 },
    Product { name: "Puzzle Set", category: "Toys", base_price: 16.5, base_margin: 0.42 },
];

const REGIONS: [&str; 4] = ["North", "South", "East", "West"];

fn main() {
    let mut rng = SimpleRng::new(42);
    let n_rows = 1500u64;

    let output_path = "sample_sales.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");
    writer
        .write_record([
            "order_id",
            "order_date",
            "category",
            "product_name",
            "quantity",
            "unit_price",
            "total_amount",
            "profit_margin",
            "region",
        ])
        .expect("Failed to write header");

    for order_id in 0..n_rows {
        let product = &PRODUCTS[rng.below(PRODUCTS.len() as u64) as usize];

        // dates span the first half of 2024
        let day_offset = rng.below(182);
        let (month, day) = month_day(day_offset);
        let hour = rng.below(24);
        let minute = rng.below(60);
        let date = format!("2024-{month:02}-{day:02} {hour:02}:{minute:02}:00");

        let quantity = 1 + rng.below(8);
        let unit_price = product.base_price * (0.9 + rng.next_f64() * 0.2);
        let total_amount = unit_price * quantity as f64;
        let margin = (product.base_margin + (rng.next_f64() - 0.5) * 0.1).max(0.01);

        // sprinkle dirty cells the loader must coerce to missing
        let quantity_cell = if order_id % 97 == 0 {
            "N/A".to_string()
        } else {
            quantity.to_string()
        };
        let category_cell = if order_id % 131 == 0 { "" } else { product.category };

        writer
            .write_record([
                (1000 + order_id).to_string(),
                date,
                category_cell.to_string(),
                product.name.to_string(),
                quantity_cell,
                format!("{unit_price:.2}"),
                format!("{total_amount:.2}"),
                format!("{margin:.3}"),
                REGIONS[rng.below(REGIONS.len() as u64) as usize].to_string(),
            ])
            .expect("Failed to write record");
    }

    writer.flush().expect("Failed to flush writer");
    println!("Wrote {n_rows} transactions to {output_path}");
}

/// Map a day offset from January 1st into (month, day) for the first half
/// of 2024 (a leap year).
fn month_day(offset: u64) -> (u64, u64) {
    let lengths = [31u64, 29, 31, 30, 31, 30, 31];
    let mut remaining = offset;
    for (i, len) in lengths.iter().enumerate() {
        if remaining < *len {
            return (i as u64 + 1, remaining + 1);
        }
        remaining -= len;
    }
    (7, 1)
}
