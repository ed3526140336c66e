//! プロンプト生成モジュール
//!
//! - build_ideas_prompt / ideas_response_schema: アイデア一覧生成
//! - build_narration_prompt / narration_response_schema: ナレーション + 画像プロンプト生成
//! - build_video_prompt: 画像プロンプトから動画プロンプトを生成
//! - 組み込みのナレーションテンプレート

use crate::types::PromptTemplate;
use serde_json::{json, Map, Value};

/// 初期トピック
pub const DEFAULT_TOPIC: &str = "Buat pembahasan tentang fakta menarik, misterius, atau sedikit ngeri seputar dunia hewan — bisa tentang hewan spesifik, perilaku, atau konsep biologis seperti predator, simbiosis, evolusi, dll.";

/// 初期のユーザー定義列
pub const DEFAULT_COLUMNS: &[&str] = &["Hewan", "fakta"];

/// 既定テンプレート名: 動物の雑学ナレーション
pub const ANIMAL_TEMPLATE_NAME: &str = "Narasi Fakta Hewan (Detail)";

/// 既定テンプレート名: 風習・伝統の雑学
pub const TRADITION_TEMPLATE_NAME: &str = "Fakta unik kebiasaan / tradisi";

/// 動物の雑学ナレーション用テンプレート（新規アイデアの初期プロンプト）
pub const ANIMAL_TEMPLATE: &str = r#"🎬 Tujuan:
Buat narasi video tentang fakta menarik, misterius, atau sedikit ngeri seputar dunia hewan — bisa tentang hewan spesifik, perilaku, atau konsep biologis seperti predator, simbiosis, evolusi, dll.

🧠 Gaya & Emosi:
Gaya narasi: penasaran, misterius, dan sedikit ngeri.
Bahasa santai seperti narator konten viral.
hindari pemakaian lo-gue gunakan aku-kamu
ubah penggunaan kata "aku" menjadi "mimin"
Penonton harus merasa “wah keren tapi agak merinding."

🧩 Struktur Saran:
Gunakan struktur berikut agar hasilnya mengalir dan tidak terasa terpisah:

---

🎙️ [HOOK] (0–5 detik)
Kalimat 1 → Pancing rasa penasaran atau heran.
Contoh: “Ternyata [Hewan] bisa [hal mengejutkan].”
Kalimat 2 → Tambahkan ekspresi ringan biar terasa alami.
Contoh: “Gue juga awalnya nggak percaya, tapi ternyata ini nyata.”

---

🎙️ [FAKTA UTAMA] (5–25 detik)
Kalimat 1 → Perkenalkan perilaku utama hewan dengan kalimat aktif.
Contoh: “[Hewan] punya kebiasaan unik, mereka sering [perilaku utama].”
Kalimat 2 → Jelaskan apa yang mereka lakukan dan kapan hal itu terjadi.
Contoh: “Biasanya ini terjadi waktu [situasi tertentu].”
Kalimat 3 → Tambahkan contoh nyata atau eksperimen.
Contoh: “Misalnya, dalam sebuah penelitian, [Hewan] bisa [aksi spesifik].”
Kalimat 4 → Jelaskan fungsi langsung dari perilaku itu.
Contoh: “Tujuannya buat [bertahan hidup / menarik pasangan / melindungi kelompok].”
Kalimat 5 → Gunakan kalimat transisi halus ke topik berbeda tapi masih nyambung.
🔹 Pola transisi yang bisa dipakai:
- “Tapi yang lebih menarik, ternyata bukan cuma itu.”
- “Uniknya, di balik kebiasaan ini, ada hal lain yang jarang diketahui.”
- “Dan ini baru sebagian kecil dari kehebatan mereka.”
- “Nah, yang bikin makin keren lagi adalah...”

---

🎙️ [DETAIL TAMBAHAN / PENJELASAN ILMIAH] (25–45 detik)
Kalimat 1 → Gunakan transisi pembuka dari kalimat sebelumnya.
Contoh: “Karena selain itu, [Hewan] juga punya kemampuan lain yang luar biasa.”
Kalimat 2 → Jelaskan fakta atau perilaku tambahan yang berbeda, tapi masih relevan.
Contoh: “Mereka bisa [kemampuan tambahan], dan itu bantu mereka [fungsi biologis].”
Kalimat 3 → Jelaskan penyebab biologisnya.
Contoh: “Hal ini terjadi karena mereka punya [bagian tubuh / sistem unik].”
Kalimat 4 → Tambahkan data ilmiah atau riset singkat.
Contoh: “Penelitian dari [nama institusi] nunjukin kalau hal ini bantu mereka bertahan di [lingkungan / kondisi ekstrem].”
Kalimat 5 → Tutup bagian ini dengan kalimat reflektif ringan.
Contoh: “Jadi makin kelihatan ya, kalau mereka bukan hewan biasa.”

---

🎙️ [EDUKASI / PESAN NILAI] (45–55 detik)
Kalimat 1 → Ambil pelajaran singkat dari keseluruhan perilaku hewan.
Contoh: “Dari [Hewan] kita belajar kalau adaptasi itu kunci buat bertahan.”
Kalimat 2 (opsional) → Tambahkan penguat pendek.
Contoh: “Kadang yang bikin kuat bukan otot, tapi cara menyesuaikan diri.”

---

🎙️ [CLOSING] (55–60 detik)
Kalimat 1 → Tutup dengan nada reflektif atau kekaguman.
Contoh: “Alam selalu punya cara elegan buat nunjukin kecerdasannya.”

🧾 Instruksi Tambahan:
- Hindari istilah ilmiah berat.
- Tidak perlu CTA promosi (“subscribe”, dll).
- Format hasil: dijadikan narasi utuh, hindari karakter karakter berlebihan yang membuat hasil text to sound menjadi aneh.
- panjang narasi WAJIB maksimal 200 kata


Topic : membahas {{Hewan}} tentang {{Idea}}
dengan fakta {{fakta}}

💬 Keluaran yang diharapkan:
buat menjadi beberapa paragraf sesuai dengan struktur penulisan [WAJIB]"#;

/// 風習・伝統の雑学ナレーション用テンプレート
pub const TRADITION_TEMPLATE: &str = r#"🎬 Tujuan:
Buat narasi YouTube Shorts  tentang kebiasaan, tradisi, atau hal unik yang dilakukan di suatu tempat di dunia.

🧠 Gaya & Emosi:
Gaya narasi: penasaran, misterius, dan sedikit ngeri.
Bahasa santai seperti narator konten viral.

🎯 Tujuan:
Menimbulkan rasa kagum, penasaran, dan “wow” melalui gaya bercerita eksploratif, bukan penjelasan ilmiah.

💬 Gaya:
Natural, misterius, dan seolah narator sedang menceritakan fakta mengejutkan.

Gunakan struktur berikut:
1. Hook Penasaran (3 detik pertama) — tunjukkan hal paling aneh atau paradoksal dari tradisi itu.
2. Fakta Utama / Latar — jelaskan singkat apa, di mana, dan mengapa tradisi itu dilakukan.
3. Detail Unik / Twist — tambahkan fakta menarik atau makna simbolik di baliknya.
4. Penutup Reflektif — simpulkan makna atau ironi tradisi itu tanpa CTA.

Gunakan bahasa yang mudah diucapkan sebagai voice-over.
Pastikan tiap kalimat mengalir alami, tidak terkesan dibaca dari naskah.

- Tidak perlu CTA promosi (“subscribe”, dll).
- Format hasil: dijadikan narasi utuh, hindari karakter karakter berlebihan yang membuat hasil text to sound menjadi aneh.
- panjang narasi WAJIB maksimal 200 kata


Topic : membahas {{Idea}}
hal yang di bahas : {{fakta}}

💬 Keluaran yang diharapkan:
buat menjadi beberapa paragraf sesuai dengan struktur penulisan [WAJIB]"#;

/// 画像プロンプト生成の指示（ナレーションプロンプトの後ろに付加）
const IMAGE_PROMPT_INSTRUCTIONS: &str = r#"Setelah membuat narasi di atas, buatlah serangkaian prompt gambar yang sangat deskriptif secara visual dalam Bahasa Indonesia. Setiap prompt harus sesuai untuk segmen video berdurasi 5 detik dan cocok dengan narasi yang dibuat. Jumlah prompt harus sesuai dengan panjang narasi (misalnya, narasi 30 detik harus menghasilkan 6 prompt, narasi 60 detik menghasilkan 12 prompt).

ATURAN KONSISTENSI VISUAL (SANGAT PENTING):
1.  **Gaya Visual Tunggal:** Pilih SATU gaya artistik yang jelas (contoh: fotorealistik, gaya anime, lukisan cat minyak, seni digital sinematik) dan terapkan secara KONSISTEN di SEMUA prompt gambar. Jangan mencampur gaya.
2.  **Konsistensi Karakter:** Jika ada karakter yang muncul berulang (misalnya, seorang ilmuwan, seekor hewan spesifik, atau karakter bernama seperti 'ADI'), deskripsikan penampilan fisik mereka (pakaian, rambut, fitur wajah, dll.) secara konsisten di setiap prompt di mana mereka muncul. Hal ini untuk memastikan AI menggambar orang atau subjek yang sama di setiap gambar.

TEKNIK PROMPT LANJUTAN UNTUK KUALITAS MAKSIMAL (WAJIB DIIKUTI):
Setiap prompt gambar HARUS dibuat menggunakan teknik profesional berikut untuk memaksimalkan kualitas gambar dari model AI seperti Imagen 3.0:
1.  **Struktur Detail:** Jelaskan komposisi, sudut pandang kamera, pencahayaan, warna, suasana, dan detail spesifik lainnya secara mendalam. Panjang setiap prompt harus minimal 150 kata.
2.  **Kata Kunci Kualitas:** Sertakan kata kunci kualitas seperti: "fotorealistik", "sangat detail", "sinematik", "resolusi tinggi", "tajam", "profesional".
3.  **Detail Teknis Kamera & Pencahayaan:** Tambahkan detail teknis fotografi untuk hasil yang lebih profesional. Contoh: "lensa 35mm, aperture f/1.8, bokeh lembut, pencahayaan sinematik, golden hour, rembrandt lighting".
4.  **Negative Prompt:** Di akhir setiap prompt, SELALU tambahkan bagian "Negative prompt:" untuk menghindari elemen yang tidak diinginkan. Contoh: "Negative prompt: teks, watermark, jelek, cacat, kualitas rendah, gambar kartun, gambar tidak realistis, jari cacat".

Setiap prompt yang dihasilkan HARUS menggabungkan semua aturan di atas.

Balas dengan objek JSON yang valid. Jangan sertakan markdown. Objek JSON harus berisi 'narration' (sebuah string hasil dari permintaan pertama) dan 'imagePrompts' (sebuah array objek, di mana setiap objek memiliki 'timestamp' seperti '0-5s', '5-10s', dst., dan sebuah 'prompt' string)."#;

/// 組み込みテンプレート一覧（保存テンプレートが空のときの初期値）
pub fn default_templates() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate::new(ANIMAL_TEMPLATE_NAME, ANIMAL_TEMPLATE),
        PromptTemplate::new(TRADITION_TEMPLATE_NAME, TRADITION_TEMPLATE),
    ]
}

/// アイデア一覧生成プロンプト
///
/// # Arguments
/// * `topic` - トピック
/// * `columns` - 生成する列（"Idea" を含む）
/// * `count` - 生成件数
pub fn build_ideas_prompt(topic: &str, columns: &[String], count: usize) -> String {
    format!(
        "Based on the topic \"{topic}\", generate {count} unique and engaging content ideas. \
For each idea, provide a value for the following fields: {fields}. \
Respond with a valid JSON array of objects. Do not include any markdown formatting or introductory text.",
        fields = columns.join(", ")
    )
}

/// アイデア一覧のレスポンススキーマ（全列が必須の文字列）
pub fn ideas_response_schema(columns: &[String]) -> Value {
    let properties: Map<String, Value> = columns
        .iter()
        .map(|column| {
            (
                column.clone(),
                json!({
                    "type": "STRING",
                    "description": format!("A creative and concise value for \"{}\"", column),
                }),
            )
        })
        .collect();

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": properties,
            "required": columns,
        }
    })
}

/// ナレーション + 画像プロンプト生成プロンプト
///
/// `rendered_prompt` は展開済みのナレーションプロンプト
pub fn build_narration_prompt(rendered_prompt: &str) -> String {
    format!("{}\n\n{}", rendered_prompt, IMAGE_PROMPT_INSTRUCTIONS)
}

/// ナレーション結果のレスポンススキーマ
pub fn narration_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "narration": {
                "type": "STRING",
                "description": "The full video narration."
            },
            "imagePrompts": {
                "type": "ARRAY",
                "description": "An array of image prompts for the video, one for each 5-second segment, with the total number of prompts matching the narration length.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "timestamp": {
                            "type": "STRING",
                            "description": "The time segment for the prompt, e.g., '0-5s'."
                        },
                        "prompt": {
                            "type": "STRING",
                            "description": "The visually descriptive, high-quality, and technically detailed image prompt for this segment, including a negative prompt."
                        }
                    },
                    "required": ["timestamp", "prompt"]
                }
            }
        },
        "required": ["narration", "imagePrompts"]
    })
}

/// 画像プロンプトから動画プロンプトを作るためのプロンプト
pub fn build_video_prompt(image_prompt: &str) -> String {
    format!(
        r#"Based on the following descriptive AI image prompt, create a concise but dynamic prompt for an AI video generator to turn the static image into a short, 5-second video clip. The video prompt should focus on subtle movements, camera motion (like a slow zoom in or a gentle pan), and atmospheric effects (like drifting smoke or shimmering light). Do not describe the image again, only describe the motion.

Image Prompt: "{image_prompt}"

Video Prompt:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::placeholders;

    fn columns() -> Vec<String> {
        vec!["Idea".to_string(), "Hewan".to_string(), "fakta".to_string()]
    }

    #[test]
    fn test_build_ideas_prompt() {
        let prompt = build_ideas_prompt("hewan laut", &columns(), 10);
        assert!(prompt.contains("\"hewan laut\""));
        assert!(prompt.contains("generate 10 unique"));
        assert!(prompt.contains("Idea, Hewan, fakta"));
    }

    #[test]
    fn test_ideas_response_schema() {
        let schema = ideas_response_schema(&columns());
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(schema["items"]["properties"]["Hewan"]["type"], "STRING");
        assert_eq!(schema["items"]["required"][2], "fakta");
    }

    #[test]
    fn test_build_narration_prompt_appends_instructions() {
        let prompt = build_narration_prompt("Narasi tentang gurita");
        assert!(prompt.starts_with("Narasi tentang gurita\n\n"));
        assert!(prompt.contains("'imagePrompts'"));
        assert!(prompt.contains("Negative prompt:"));
    }

    #[test]
    fn test_narration_response_schema() {
        let schema = narration_response_schema();
        assert_eq!(schema["required"][0], "narration");
        assert_eq!(schema["properties"]["imagePrompts"]["type"], "ARRAY");
    }

    #[test]
    fn test_build_video_prompt() {
        let prompt = build_video_prompt("Gurita di dasar laut");
        assert!(prompt.contains("Image Prompt: \"Gurita di dasar laut\""));
        assert!(prompt.trim_end().ends_with("Video Prompt:"));
    }

    #[test]
    fn test_default_templates_placeholders() {
        let templates = default_templates();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].name, ANIMAL_TEMPLATE_NAME);
        assert_eq!(placeholders(&templates[0].template), vec!["Hewan", "Idea", "fakta"]);
        assert_eq!(placeholders(&templates[1].template), vec!["Idea", "fakta"]);
    }
}
